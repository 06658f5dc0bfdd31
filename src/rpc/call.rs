//! A single trait for the whole family of RPC procedures (design note §9),
//! replacing the source's per-procedure class hierarchy with virtual
//! encode/decode. `send_and_wait` (src/connection/conn.rs) is generic over
//! this trait; each procedure (MOUNT.MNT, NFSv3.LOOKUP, NFSv4.COMPOUND, …)
//! implements it as a small value instead of a subclass.

use std::io;

use crate::packet::Packet;
use crate::rpc::header::{encode_call_header, AuthUnixCredential};
use crate::rpc::xid::XidGenerator;
use crate::transport::Transport;

/// One RPC procedure invocation: knows its own program/version/procedure
/// numbers and how to encode its arguments / decode its result.
pub trait RemoteCall {
    type Result;

    fn program(&self) -> u32;
    fn version(&self) -> u32;
    fn procedure(&self) -> u32;

    /// Encodes the procedure-specific arguments (everything after the
    /// RPC header) into `pkt`.
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()>;

    /// Decodes the procedure-specific result from the bytes remaining in
    /// `pkt` once the reply header's accept-status has been consumed.
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Self::Result>;
}

/// Builds a complete, ready-to-send RPC call packet for `call`: the RPC
/// header (spec §4.2) followed by the procedure's encoded arguments, and
/// for TCP, wrapped in a one-fragment record-marking header (spec §4.2 /
/// §6).
pub fn build_request<C: RemoteCall>(
    call: &C,
    xid: u32,
    cred: &AuthUnixCredential,
    transport: Transport,
) -> io::Result<Packet> {
    let mut pkt = Packet::new();
    if transport == Transport::Tcp {
        pkt.reserve_header_placeholder();
    }
    encode_call_header(
        &mut pkt,
        xid,
        call.program(),
        call.version(),
        call.procedure(),
        cred,
    )?;
    call.encode_args(&mut pkt)?;
    if transport == Transport::Tcp {
        let len = (pkt.len() - 4) as u32;
        pkt.patch_u32_at(0, len | 0x8000_0000)?;
    }
    Ok(pkt)
}

/// Convenience: allocates a call's XID from the connection's generator and
/// builds its request packet in one step.
pub fn build_request_with_xid<C: RemoteCall>(
    call: &C,
    xid_gen: &XidGenerator,
    cred: &AuthUnixCredential,
    transport: Transport,
) -> io::Result<(u32, Packet)> {
    let xid = xid_gen.next();
    let pkt = build_request(call, xid, cred, transport)?;
    Ok((xid, pkt))
}
