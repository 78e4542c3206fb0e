//! SocketCAN module

use std::io::ErrorKind;

use socketcan::{
    CanAnyFrame, CanDataFrame, CanFdFrame, CanFdSocket, EmbeddedFrame, ExtendedId, Frame, Id,
    Socket, StandardId,
};

use crate::channel::{CanBus, CanFrame, ChannelError, ChannelResult};

/// CAN bus on a SocketCAN network interface, such as `can0` or `vcan0`.
///
/// The socket is opened in CAN-FD mode, so it carries classical and CAN-FD frames.
pub struct SocketCanBus {
    interface: String,
    socket: CanFdSocket,
}

impl std::fmt::Debug for SocketCanBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketCanBus")
            .field("interface", &self.interface)
            .finish()
    }
}

impl SocketCanBus {
    /// Opens the network interface `interface`
    pub fn open(interface: &str) -> ChannelResult<Self> {
        let socket = CanFdSocket::open(interface)?;
        socket.set_nonblocking(true)?;
        log::debug!("Opened SocketCAN interface {interface}");
        Ok(Self {
            interface: interface.to_string(),
            socket,
        })
    }

    /// Name of the network interface
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

fn socketcan_id(frame: &CanFrame) -> ChannelResult<Id> {
    let id = if frame.is_extended() {
        ExtendedId::new(frame.get_address()).map(Id::Extended)
    } else {
        u16::try_from(frame.get_address())
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    };
    id.ok_or_else(|| {
        ChannelError::InvalidFrame(format!(
            "identifier {:#X} is out of range",
            frame.get_address()
        ))
    })
}

fn convert<F: Frame>(frame: &F) -> CanFrame {
    CanFrame::new(
        frame.raw_id(),
        EmbeddedFrame::data(frame),
        EmbeddedFrame::is_extended(frame),
    )
}

impl CanBus for SocketCanBus {
    fn send(&self, frame: &CanFrame) -> ChannelResult<()> {
        frame.validate()?;
        let id = socketcan_id(frame)?;
        let invalid =
            || ChannelError::InvalidFrame(format!("{} data bytes", frame.get_data().len()));
        if frame.is_fd() {
            let fd_frame =
                <CanFdFrame as EmbeddedFrame>::new(id, frame.get_data()).ok_or_else(invalid)?;
            self.socket.write_frame(&fd_frame)?;
        } else {
            let data_frame =
                <CanDataFrame as EmbeddedFrame>::new(id, frame.get_data()).ok_or_else(invalid)?;
            self.socket.write_frame(&data_frame)?;
        }
        Ok(())
    }

    fn recv(&self) -> ChannelResult<Option<CanFrame>> {
        match self.socket.read_frame() {
            Ok(CanAnyFrame::Normal(f)) => Ok(Some(convert(&f))),
            Ok(CanAnyFrame::Fd(f)) => Ok(Some(convert(&f).with_fd(true))),
            // Remote and error frames carry no diagnostic data
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
