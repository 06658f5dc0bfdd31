//! Connection bring-up demo (SPEC_FULL.md §B.3): port-mapper `DUMP`,
//! then a MOUNT `NULL` and NFSv3 `NULL` ping against the ports it
//! discovers. Demonstrates the bottom of the stack — `ConnectionGroup`
//! discovery plus `send_and_wait` — without touching any file data.

use clap::Parser;
use tracing::info;

use fma_nfs::connection::conn::Connection;
use fma_nfs::connection::key::ConnectionKey;
use fma_nfs::group::{ConnectionGroup, GroupKey, ServiceType};
use fma_nfs::mount;
use fma_nfs::nfs3::calls as nfs3;
use fma_nfs::portmap;
use fma_nfs::rpc::header::AuthUnixCredential;
use fma_nfs::Transport;

#[derive(Parser, Debug)]
#[command(about = "Ping PMAP/MOUNT/NFSv3 NULL procedures against a server")]
struct Args {
    /// Server address (IPv4 or IPv6; a colon selects IPv6)
    server: String,
    /// Transport to use for the port-mapper and discovered services
    #[arg(long, value_enum, default_value = "tcp")]
    transport: TransportArg,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum TransportArg {
    Tcp,
    Udp,
}

impl From<TransportArg> for Transport {
    fn from(t: TransportArg) -> Self {
        match t {
            TransportArg::Tcp => Transport::Tcp,
            TransportArg::Udp => Transport::Udp,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let transport: Transport = args.transport.into();

    let pmap_key = ConnectionKey::new(args.server.clone(), portmap::WELL_KNOWN_PORT, transport);
    let pmap_conn = Connection::new(pmap_key, AuthUnixCredential::anonymous(), false);
    pmap_conn.connect()?;
    info!(server = %args.server, "sending PMAP NULL");
    pmap_conn.send_and_wait(&portmap::PmapNull, 0)?;
    println!("PMAP NULL ok");

    let group = ConnectionGroup::get_or_create(GroupKey {
        server: args.server.clone(),
        transport,
        nfs_version: 3,
    });
    group.ensure_connection()?;

    if let Some(conn) = group.connection(ServiceType::Mount) {
        conn.send_and_wait(&mount::MountNull, 0)?;
        println!("MOUNT NULL ok ({})", conn.key());
    } else {
        println!("MOUNT: port mapper advertised no mapping, skipped");
    }

    if let Some(conn) = group.connection(ServiceType::Nfs) {
        conn.send_and_wait(&nfs3::Nfs3Null, 0)?;
        println!("NFSv3 NULL ok ({})", conn.key());
    } else {
        println!("NFSv3: port mapper advertised no mapping, skipped");
    }

    Ok(())
}
