// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! `NETLINK_KOBJECT_UEVENT` socket subscribed to the kernel multicast group

use nix::errno::Errno;
use nix::sys::socket::{
    bind, recv, setsockopt, socket, sockopt, AddressFamily, MsgFlags, NetlinkAddr, SockFlag,
    SockProtocol, SockType,
};
use nix::sys::time::{TimeVal, TimeValLike};
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use super::UeventSource;
use crate::error::{InventoryError, Result};

/// Kernel uevent multicast group
const KERNEL_GROUP: u32 = 1;

/// Large enough for any single uevent
const RECV_BUFFER: usize = 8192;

/// Live kernel hot-plug channel
#[derive(Debug)]
pub struct NetlinkUeventSocket {
    fd: OwnedFd,
    current_timeout: Option<Duration>,
}

impl NetlinkUeventSocket {
    pub fn open() -> Result<Self> {
        let fd = socket(
            AddressFamily::Netlink,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            SockProtocol::NetlinkKObjectUEvent,
        )
        .map_err(|e| InventoryError::Hotplug(format!("socket: {}", e)))?;
        bind(fd.as_raw_fd(), &NetlinkAddr::new(0, KERNEL_GROUP))
            .map_err(|e| InventoryError::Hotplug(format!("bind: {}", e)))?;
        log::debug!("Subscribed to kernel uevents");
        Ok(Self {
            fd,
            current_timeout: None,
        })
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if self.current_timeout == Some(timeout) {
            return Ok(());
        }
        // A zero timeval means "block forever"; never ask for that.
        let ms = timeout.as_millis().clamp(1, i64::MAX as u128) as i64;
        setsockopt(&self.fd, sockopt::ReceiveTimeout, &TimeVal::milliseconds(ms))?;
        self.current_timeout = Some(timeout);
        Ok(())
    }

    fn read(&self, flags: MsgFlags) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; RECV_BUFFER];
        match recv(self.fd.as_raw_fd(), &mut buf, flags) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(None),
            // Kernel dropped messages because we fell behind; keep going.
            Err(Errno::ENOBUFS) => Err(InventoryError::Hotplug("uevent queue overflow".into())),
            Err(e) => Err(e.into()),
        }
    }
}

impl UeventSource for NetlinkUeventSocket {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        self.set_timeout(timeout)?;
        self.read(MsgFlags::empty())
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        self.read(MsgFlags::MSG_DONTWAIT)
    }
}
