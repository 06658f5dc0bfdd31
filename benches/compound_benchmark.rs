//! Throughput of the NFSv4 compound encode/decode path (SPEC_FULL.md
//! §A.4), the same `criterion` harness graymamba uses for
//! `benches/readdir_benchmark.rs`, minus the async runtime since this
//! core is thread-per-call rather than `tokio`-driven.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use fma_nfs::attr::NfsAttr;
use fma_nfs::nfs4::attr as fattr4;
use fma_nfs::nfs4::compound::{CompoundBuilder, CompoundReply};
use fma_nfs::nfs4::op::{self, CompoundOp};
use fma_nfs::packet::Packet;
use fma_nfs::rpc::call::RemoteCall;

fn build_lookup_chain(depth: usize) -> CompoundBuilder {
    let mut builder = CompoundBuilder::new().push(CompoundOp::PutRootFh);
    for i in 0..depth {
        builder = builder.push(CompoundOp::Lookup { name: format!("component-{i}") });
    }
    builder
        .push(CompoundOp::GetFh)
        .push(CompoundOp::GetAttr { bitmap: fattr4::full_bitmap() })
}

fn encode_reply_for(depth: usize) -> Vec<u8> {
    let mut pkt = Packet::new();
    pkt.encode_u32(0).unwrap(); // NFS4_OK
    pkt.encode_string("").unwrap();
    pkt.encode_u32((depth + 3) as u32).unwrap();

    pkt.encode_u32(op::OP_PUTROOTFH).unwrap();
    pkt.encode_u32(0).unwrap();
    for _ in 0..depth {
        pkt.encode_u32(op::OP_LOOKUP).unwrap();
        pkt.encode_u32(0).unwrap();
    }
    pkt.encode_u32(op::OP_GETFH).unwrap();
    pkt.encode_u32(0).unwrap();
    pkt.encode_var_opaque(&[0xABu8; 32]).unwrap();
    pkt.encode_u32(op::OP_GETATTR).unwrap();
    pkt.encode_u32(0).unwrap();
    let attr = NfsAttr::new();
    fattr4::encode_bitmap(&mut pkt, fattr4::request_bitmap(&attr)).unwrap();
    pkt.encode_var_opaque(&[]).unwrap();

    pkt.into_bytes()
}

fn bench_compound_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("compound_encode");
    for depth in [1usize, 4, 16, 64] {
        let call = build_lookup_chain(depth).build();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut pkt = Packet::new();
                call.encode_args(&mut pkt).unwrap();
                pkt
            });
        });
    }
    group.finish();
}

fn bench_compound_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("compound_decode");
    for depth in [1usize, 4, 16, 64] {
        let call = build_lookup_chain(depth).build();
        let bytes = encode_reply_for(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut pkt = Packet::from_bytes(bytes.clone());
                let reply: CompoundReply = call.decode_result(&mut pkt).unwrap();
                reply
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compound_encode, bench_compound_decode);
criterion_main!(benches);
