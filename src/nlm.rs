//! NLM v4 (Network Lock Manager, program 100021 version 4): the
//! byte-range advisory locking protocol NFSv3 relies on since `nfsstat3`
//! has no locking operations of its own. Grounded on the call shapes in
//! `NlmCall.h`/`nfsrpc/nlm.h` (`nlm4_testargs`/`nlm4_lockargs`/
//! `nlm4_cancargs`/`nlm4_unlockargs`, all built around the common
//! `nlm4_lock` record).

use std::io;

use crate::packet::Packet;
use crate::rpc::call::RemoteCall;

pub const PROGRAM: u32 = 100021;
pub const VERSION: u32 = 4;

const PROC_NULL: u32 = 0;
const PROC_TEST: u32 = 1;
const PROC_LOCK: u32 = 2;
const PROC_CANCEL: u32 = 3;
const PROC_UNLOCK: u32 = 4;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum nlm4_stat {
    Granted,
    Denied,
    DeniedNoLocks,
    Blocked,
    DeniedGracePeriod,
    Deadlck,
    Rofs,
    StaleFh,
    FBig,
    Failed,
    Other(u32),
}

impl nlm4_stat {
    pub fn from_wire(v: u32) -> Self {
        match v {
            0 => nlm4_stat::Granted,
            1 => nlm4_stat::Denied,
            2 => nlm4_stat::DeniedNoLocks,
            3 => nlm4_stat::Blocked,
            4 => nlm4_stat::DeniedGracePeriod,
            5 => nlm4_stat::Deadlck,
            6 => nlm4_stat::Rofs,
            7 => nlm4_stat::StaleFh,
            8 => nlm4_stat::FBig,
            9 => nlm4_stat::Failed,
            other => nlm4_stat::Other(other),
        }
    }

    pub fn is_granted(self) -> bool {
        matches!(self, nlm4_stat::Granted)
    }
}

/// `nlm4_lock`: the common byte-range lock descriptor every NLM call
/// carries (`caller_name`, filehandle, an opaque per-process owner
/// handle, the process id the original caller used, and the range).
#[derive(Debug, Clone)]
pub struct Nlm4Lock {
    pub caller_name: String,
    pub fh: Vec<u8>,
    pub owner: Vec<u8>,
    pub svid: i32,
    pub offset: u64,
    pub len: u64,
}

impl Nlm4Lock {
    fn encode(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_string(&self.caller_name)?;
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_var_opaque(&self.owner)?;
        pkt.encode_u32(self.svid as u32)?;
        pkt.encode_u64(self.offset)?;
        pkt.encode_u64(self.len)
    }
}

pub struct Nlm4Null;

impl RemoteCall for Nlm4Null {
    type Result = ();
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_NULL
    }
    fn encode_args(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
    fn decode_result(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
}

/// A denied lock's current holder, returned by `TEST` when the range is
/// already held by someone else.
#[derive(Debug, Clone)]
pub struct Nlm4Holder {
    pub exclusive: bool,
    pub svid: i32,
    pub owner: Vec<u8>,
    pub offset: u64,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub cookie: Vec<u8>,
    pub stat: nlm4_stat,
    pub holder: Option<Nlm4Holder>,
}

pub struct Test {
    pub cookie: Vec<u8>,
    pub exclusive: bool,
    pub lock: Nlm4Lock,
}

impl RemoteCall for Test {
    type Result = TestResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_TEST
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.cookie)?;
        pkt.encode_bool(self.exclusive)?;
        self.lock.encode(pkt)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<TestResult> {
        let cookie = pkt.decode_var_opaque()?;
        let stat = nlm4_stat::from_wire(pkt.decode_u32()?);
        let holder = if stat == nlm4_stat::Denied {
            let exclusive = pkt.decode_bool()?;
            let svid = pkt.decode_u32()? as i32;
            let owner = pkt.decode_var_opaque()?;
            let offset = pkt.decode_u64()?;
            let len = pkt.decode_u64()?;
            Some(Nlm4Holder {
                exclusive,
                svid,
                owner,
                offset,
                len,
            })
        } else {
            None
        };
        Ok(TestResult { cookie, stat, holder })
    }
}

#[derive(Debug, Clone)]
pub struct Nlm4Res {
    pub cookie: Vec<u8>,
    pub stat: nlm4_stat,
}

fn decode_nlm4_res(pkt: &mut Packet) -> io::Result<Nlm4Res> {
    let cookie = pkt.decode_var_opaque()?;
    let stat = nlm4_stat::from_wire(pkt.decode_u32()?);
    Ok(Nlm4Res { cookie, stat })
}

pub struct Lock {
    pub cookie: Vec<u8>,
    pub block: bool,
    pub exclusive: bool,
    pub lock: Nlm4Lock,
    pub reclaim: bool,
    pub state: u32,
}

impl RemoteCall for Lock {
    type Result = Nlm4Res;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_LOCK
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.cookie)?;
        pkt.encode_bool(self.block)?;
        pkt.encode_bool(self.exclusive)?;
        self.lock.encode(pkt)?;
        pkt.encode_bool(self.reclaim)?;
        pkt.encode_u32(self.state)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Nlm4Res> {
        decode_nlm4_res(pkt)
    }
}

pub struct Cancel {
    pub cookie: Vec<u8>,
    pub block: bool,
    pub exclusive: bool,
    pub lock: Nlm4Lock,
}

impl RemoteCall for Cancel {
    type Result = Nlm4Res;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_CANCEL
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.cookie)?;
        pkt.encode_bool(self.block)?;
        pkt.encode_bool(self.exclusive)?;
        self.lock.encode(pkt)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Nlm4Res> {
        decode_nlm4_res(pkt)
    }
}

pub struct Unlock {
    pub cookie: Vec<u8>,
    pub lock: Nlm4Lock,
}

impl RemoteCall for Unlock {
    type Result = Nlm4Res;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_UNLOCK
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.cookie)?;
        self.lock.encode(pkt)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Nlm4Res> {
        decode_nlm4_res(pkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lock() -> Nlm4Lock {
        Nlm4Lock {
            caller_name: "fma-nfs".into(),
            fh: vec![1, 2, 3],
            owner: vec![9, 9],
            svid: 42,
            offset: 0,
            len: 100,
        }
    }

    #[test]
    fn test_call_encodes_cookie_before_lock() {
        let call = Test {
            cookie: vec![0xAB],
            exclusive: true,
            lock: sample_lock(),
        };
        let mut pkt = Packet::new();
        call.encode_args(&mut pkt).unwrap();
        pkt.seek_read(0);
        assert_eq!(pkt.decode_var_opaque().unwrap(), vec![0xAB]);
        assert!(pkt.decode_bool().unwrap());
        assert_eq!(pkt.decode_string().unwrap(), "fma-nfs");
    }

    #[test]
    fn test_result_denied_carries_holder() {
        let mut pkt = Packet::new();
        pkt.encode_var_opaque(&[0xAB]).unwrap();
        pkt.encode_u32(1).unwrap(); // nlm4_denied
        pkt.encode_bool(true).unwrap();
        pkt.encode_u32(7).unwrap();
        pkt.encode_var_opaque(&[1, 2]).unwrap();
        pkt.encode_u64(0).unwrap();
        pkt.encode_u64(50).unwrap();
        pkt.seek_read(0);

        let call = Test {
            cookie: vec![0xAB],
            exclusive: true,
            lock: sample_lock(),
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert_eq!(result.stat, nlm4_stat::Denied);
        let holder = result.holder.unwrap();
        assert_eq!(holder.svid, 7);
        assert_eq!(holder.len, 50);
    }

    #[test]
    fn lock_result_decodes_granted() {
        let mut pkt = Packet::new();
        pkt.encode_var_opaque(&[1]).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.seek_read(0);
        let call = Lock {
            cookie: vec![1],
            block: false,
            exclusive: false,
            lock: sample_lock(),
            reclaim: false,
            state: 0,
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert!(result.stat.is_granted());
    }
}
