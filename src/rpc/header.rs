//! ONC-RPC call/reply header codec (RFC 5531) and the AUTH_UNIX credential
//! (spec §4.2). The core never authenticates as anything but anonymous
//! AUTH_UNIX (spec §1 non-goals); the verifier that accompanies every call
//! is always AUTH_NULL.

use std::io;

use crate::packet::Packet;

pub const RPC_VERSION: u32 = 2;

pub const MSG_TYPE_CALL: u32 = 0;
pub const MSG_TYPE_REPLY: u32 = 1;

pub const AUTH_FLAVOR_NULL: u32 = 0;
pub const AUTH_FLAVOR_UNIX: u32 = 1;

pub const REPLY_MSG_ACCEPTED: u32 = 0;
pub const REPLY_MSG_DENIED: u32 = 1;

pub const ACCEPT_SUCCESS: u32 = 0;
pub const ACCEPT_PROG_UNAVAIL: u32 = 1;
pub const ACCEPT_PROG_MISMATCH: u32 = 2;
pub const ACCEPT_PROC_UNAVAIL: u32 = 3;
pub const ACCEPT_GARBAGE_ARGS: u32 = 4;
pub const ACCEPT_SYSTEM_ERR: u32 = 5;

/// The anonymous AUTH_UNIX credential body this core always sends:
/// stamp=0, a short machine name, uid=gid=0, and no auxiliary groups.
#[derive(Debug, Clone)]
pub struct AuthUnixCredential {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
}

impl AuthUnixCredential {
    pub fn anonymous() -> Self {
        let machine_name = hostname_short();
        Self {
            stamp: 0,
            machine_name,
            uid: 0,
            gid: 0,
        }
    }

    fn encode_body(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_u32(self.stamp)?;
        pkt.encode_string(&self.machine_name)?;
        pkt.encode_u32(self.uid)?;
        pkt.encode_u32(self.gid)?;
        pkt.encode_u32(0) // aux-gid count, always zero
    }
}

fn hostname_short() -> String {
    // A short, stable machine name; the wire format does not require this
    // to resolve to anything, only that it round-trips.
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::process::Command::new("hostname")
                .output()
                .ok()
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "fma-nfs".to_string())
}

/// Writes the credential as AUTH_UNIX, length-prefixed, and a zero-length
/// AUTH_NULL verifier, matching spec §4.2 exactly.
pub fn write_credential_and_verifier(pkt: &mut Packet, cred: &AuthUnixCredential) -> io::Result<()> {
    let mut body = Packet::new();
    cred.encode_body(&mut body)?;
    pkt.encode_u32(AUTH_FLAVOR_UNIX)?;
    pkt.encode_var_opaque(body.as_bytes())?;
    // AUTH_NULL verifier: flavor=0, length=0
    pkt.encode_u32(AUTH_FLAVOR_NULL)?;
    pkt.encode_u32(0)
}

/// Encodes a full RPC call header: xid, CALL, rpcvers=2, prog, vers, proc,
/// credential, verifier. The caller appends its procedure-specific
/// arguments after this returns.
pub fn encode_call_header(
    pkt: &mut Packet,
    xid: u32,
    program: u32,
    version: u32,
    procedure: u32,
    cred: &AuthUnixCredential,
) -> io::Result<()> {
    pkt.encode_u32(xid)?;
    pkt.encode_u32(MSG_TYPE_CALL)?;
    pkt.encode_u32(RPC_VERSION)?;
    pkt.encode_u32(program)?;
    pkt.encode_u32(version)?;
    pkt.encode_u32(procedure)?;
    write_credential_and_verifier(pkt, cred)
}

#[derive(Debug, Clone)]
pub enum AcceptedStatus {
    Success,
    ProgUnavail,
    ProgMismatch { low: u32, high: u32 },
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

#[derive(Debug, Clone)]
pub enum ReplyStatus {
    Accepted(AcceptedStatus),
    Denied,
}

#[derive(Debug, Clone)]
pub struct ReplyHeader {
    pub xid: u32,
    pub status: ReplyStatus,
}

/// Parses an RPC reply header: xid, REPLY, reply status, and on an
/// accepted reply, skips the verifier and accept-status before returning.
/// On `AcceptedStatus::Success` the caller's decoder is handed the
/// remaining packet bytes.
pub fn decode_reply_header(pkt: &mut Packet) -> io::Result<ReplyHeader> {
    let xid = pkt.decode_u32()?;
    let msg_type = pkt.decode_u32()?;
    if msg_type != MSG_TYPE_REPLY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected REPLY message type, got {msg_type}"),
        ));
    }
    let reply_stat = pkt.decode_u32()?;
    let status = match reply_stat {
        0 => {
            // verifier
            let _flavor = pkt.decode_u32()?;
            let _verf = pkt.decode_var_opaque()?;
            let accept_stat = pkt.decode_u32()?;
            let accepted = match accept_stat {
                ACCEPT_SUCCESS => AcceptedStatus::Success,
                ACCEPT_PROG_UNAVAIL => AcceptedStatus::ProgUnavail,
                ACCEPT_PROG_MISMATCH => {
                    let low = pkt.decode_u32()?;
                    let high = pkt.decode_u32()?;
                    AcceptedStatus::ProgMismatch { low, high }
                }
                ACCEPT_PROC_UNAVAIL => AcceptedStatus::ProcUnavail,
                ACCEPT_GARBAGE_ARGS => AcceptedStatus::GarbageArgs,
                ACCEPT_SYSTEM_ERR => AcceptedStatus::SystemErr,
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unknown accept_stat {other}"),
                    ))
                }
            };
            ReplyStatus::Accepted(accepted)
        }
        1 => ReplyStatus::Denied,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown reply_stat {other}"),
            ))
        }
    };
    Ok(ReplyHeader { xid, status })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_header_round_trips_xid_and_procedure_fields() {
        let mut pkt = Packet::new();
        let cred = AuthUnixCredential::anonymous();
        encode_call_header(&mut pkt, 42, 100003, 3, 1, &cred).unwrap();
        pkt.seek_read(0);
        assert_eq!(pkt.decode_u32().unwrap(), 42);
        assert_eq!(pkt.decode_u32().unwrap(), MSG_TYPE_CALL);
        assert_eq!(pkt.decode_u32().unwrap(), RPC_VERSION);
        assert_eq!(pkt.decode_u32().unwrap(), 100003);
        assert_eq!(pkt.decode_u32().unwrap(), 3);
        assert_eq!(pkt.decode_u32().unwrap(), 1);
        assert_eq!(pkt.decode_u32().unwrap(), AUTH_FLAVOR_UNIX);
    }

    #[test]
    fn decode_accepted_success_reply() {
        let mut pkt = Packet::new();
        pkt.encode_u32(42).unwrap();
        pkt.encode_u32(MSG_TYPE_REPLY).unwrap();
        pkt.encode_u32(0).unwrap(); // MSG_ACCEPTED
        pkt.encode_u32(AUTH_FLAVOR_NULL).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(ACCEPT_SUCCESS).unwrap();
        pkt.encode_u32(0xCAFE).unwrap(); // procedure result payload
        pkt.seek_read(0);
        let header = decode_reply_header(&mut pkt).unwrap();
        assert_eq!(header.xid, 42);
        assert!(matches!(
            header.status,
            ReplyStatus::Accepted(AcceptedStatus::Success)
        ));
        assert_eq!(pkt.decode_u32().unwrap(), 0xCAFE);
    }
}
