use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use snmp_core::config::parse_engine_id;
use snmp_core::snmp::message::SnmpVersion;
use snmp_core::snmp::pdu::{ObjectSyntax, Pdu, VarBind};
use snmp_core::usm::{AuthProtocol, PrivProtocol, SecurityLevel};
use snmp_core::{Oid, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "snmp-core", about = "SNMP v1/v2c/v3 command-line client")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(flatten)]
    session: SessionArgs,
}

#[derive(Parser, Debug, Clone)]
struct SessionArgs {
    /// SNMP protocol version.
    #[clap(long, value_enum, default_value_t = CliVersion::V2c)]
    version: CliVersion,

    /// Community string, required for v1/v2c.
    #[clap(short, long, default_value = "public")]
    community: String,

    /// Request timeout per attempt, in seconds.
    #[clap(long, default_value_t = 5)]
    timeout: u64,

    /// Number of retries after the first attempt fails.
    #[clap(long, default_value_t = 0)]
    retries: u32,

    /// v3 security username.
    #[clap(long, default_value = "")]
    user: String,

    /// v3 security level.
    #[clap(long, value_enum, default_value_t = CliSecurityLevel::NoAuthNoPriv)]
    security_level: CliSecurityLevel,

    /// v3 authentication protocol.
    #[clap(long, value_enum, default_value_t = CliAuthProtocol::Md5)]
    auth_protocol: CliAuthProtocol,

    /// v3 authentication password (at least 8 octets).
    #[clap(long, default_value = "")]
    auth_password: String,

    /// v3 privacy protocol.
    #[clap(long, value_enum, default_value_t = CliPrivProtocol::Des)]
    priv_protocol: CliPrivProtocol,

    /// v3 privacy password (at least 8 octets).
    #[clap(long, default_value = "")]
    priv_password: String,

    /// Known security engine ID, hex-encoded with an optional 0x prefix.
    /// Skips discovery when given.
    #[clap(long)]
    engine_id: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliVersion {
    V1,
    V2c,
    V3,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAuthProtocol {
    Md5,
    Sha1,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPrivProtocol {
    Des,
    Aes,
}

impl SessionArgs {
    fn build(&self, target: &str) -> Result<SessionConfig> {
        let engine_id = self
            .engine_id
            .as_deref()
            .map(parse_engine_id)
            .transpose()
            .map_err(|e| anyhow!("{e}"))?;

        Ok(SessionConfig {
            version: match self.version {
                CliVersion::V1 => SnmpVersion::V1,
                CliVersion::V2c => SnmpVersion::V2c,
                CliVersion::V3 => SnmpVersion::V3,
            },
            address: target.to_string(),
            timeout: Duration::from_secs(self.timeout),
            retries: self.retries,
            community: self.community.clone(),
            user_name: self.user.clone(),
            security_level: match self.security_level {
                CliSecurityLevel::NoAuthNoPriv => SecurityLevel::NoAuthNoPriv,
                CliSecurityLevel::AuthNoPriv => SecurityLevel::AuthNoPriv,
                CliSecurityLevel::AuthPriv => SecurityLevel::AuthPriv,
            },
            auth_password: self.auth_password.clone(),
            auth_protocol: match self.auth_protocol {
                CliAuthProtocol::Md5 => AuthProtocol::Md5,
                CliAuthProtocol::Sha1 => AuthProtocol::Sha1,
            },
            priv_password: self.priv_password.clone(),
            priv_protocol: match self.priv_protocol {
                CliPrivProtocol::Des => PrivProtocol::Des,
                CliPrivProtocol::Aes => PrivProtocol::Aes,
            },
            security_engine_id: engine_id,
            ..SessionConfig::default()
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GetRequest for one or more OIDs.
    Get {
        #[clap(required = true, num_args = 1..)]
        targets: Vec<String>,
        #[clap(short, long, required = true)]
        oid: String,
    },
    /// Walks a subtree with repeated GetNextRequests.
    Walk {
        #[clap(required = true, num_args = 1..)]
        targets: Vec<String>,
        #[clap(short, long, required = true)]
        oid: String,
    },
    /// A single GetBulkRequest.
    Bulk {
        #[clap(short, long, required = true)]
        target: String,
        #[clap(short, long, default_value_t = 0)]
        non_repeaters: i32,
        #[clap(short, long, default_value_t = 10)]
        max_repetitions: i32,
        #[clap(required = true, num_args = 1..)]
        oids: Vec<String>,
    },
    /// Walks one or more subtrees to completion with GetBulkRequest.
    BulkWalk {
        #[clap(short, long, required = true)]
        target: String,
        #[clap(short, long, default_value_t = 20)]
        max_repetitions: i32,
        #[clap(required = true, num_args = 1..)]
        oids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let multi_progress = MultiProgress::new();
    let main_pb = multi_progress.add(ProgressBar::new(0));
    main_pb.set_style(ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
    )?);

    match cli.command {
        Command::Get { targets, oid } => {
            let oid: Oid = oid.parse().map_err(|e| anyhow!("{e}"))?;
            main_pb.set_length(targets.len() as u64);
            let futures = targets
                .iter()
                .map(|target| run_get(&cli.session, target, oid.clone()));
            let results = join_all(futures).await;

            for (target, result) in targets.iter().zip(results) {
                main_pb.inc(1);
                println!("\n--- Result for {target} ---");
                match result {
                    Ok(varbinds) => varbinds.iter().for_each(print_varbind),
                    Err(e) => println!("Error: {e}"),
                }
            }
            main_pb.finish_and_clear();
        }
        Command::Walk { targets, oid } => {
            let oid: Oid = oid.parse().map_err(|e| anyhow!("{e}"))?;
            main_pb.set_length(targets.len() as u64);
            let futures = targets
                .iter()
                .map(|target| run_walk(&cli.session, target, oid.clone()));
            let results = join_all(futures).await;

            for (target, result) in targets.iter().zip(results) {
                main_pb.inc(1);
                println!("\n--- Result for {target} ---");
                match result {
                    Ok(varbinds) => {
                        println!("Success! (found {} results)", varbinds.len());
                        varbinds.iter().for_each(print_varbind);
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            main_pb.finish_and_clear();
        }
        Command::Bulk {
            target,
            non_repeaters,
            max_repetitions,
            oids,
        } => {
            main_pb.set_length(1);
            let oids = parse_oids(&oids)?;
            let config = cli.session.build(&target)?;
            let mut session = Session::new(config)?;
            session.open().await.context("opening session")?;
            let response = session
                .get_bulk_request(&oids, non_repeaters, max_repetitions)
                .await?;
            session.close().await;
            main_pb.inc(1);
            main_pb.finish_and_clear();

            let varbinds = response.into_varbinds();
            println!("Success, found {} results", varbinds.len());
            varbinds.iter().for_each(print_varbind);
        }
        Command::BulkWalk {
            target,
            max_repetitions,
            oids,
        } => {
            main_pb.set_length(1);
            let oids = parse_oids(&oids)?;
            let config = cli.session.build(&target)?;
            let mut session = Session::new(config)?;
            session.open().await.context("opening session")?;
            let response = session.get_bulk_walk(&oids, 0, max_repetitions).await?;
            session.close().await;
            main_pb.inc(1);
            main_pb.finish_and_clear();

            let varbinds = response.into_varbinds();
            println!("Success, found {} results", varbinds.len());
            varbinds.iter().for_each(print_varbind);
        }
    }
    Ok(())
}

fn parse_oids(oids: &[String]) -> Result<Vec<Oid>> {
    oids.iter()
        .map(|s| s.parse::<Oid>().map_err(|e| anyhow!("{e}")))
        .collect()
}

async fn run_get(args: &SessionArgs, target: &str, oid: Oid) -> Result<Vec<VarBind>> {
    let config = args.build(target)?;
    let mut session = Session::new(config)?;
    session.open().await.context("opening session")?;
    let response = session.get_request(&[oid]).await?;
    session.close().await;
    Ok(response.into_varbinds())
}

async fn run_walk(args: &SessionArgs, target: &str, root: Oid) -> Result<Vec<VarBind>> {
    let config = args.build(target)?;
    let mut session = Session::new(config)?;
    session.open().await.context("opening session")?;

    let mut results = Vec::new();
    let mut current = root.clone();
    loop {
        let response = session.get_next_request(&[current.clone()]).await?;
        let Pdu::Standard { varbinds, .. } = &response else {
            break;
        };
        let Some(varbind) = varbinds.first() else {
            break;
        };
        if !root.is_strict_prefix_of(&varbind.oid) || varbind.value.is_exception() {
            break;
        }
        current = varbind.oid.clone();
        results.push(varbind.clone());
    }

    session.close().await;
    Ok(results)
}

fn print_varbind(varbind: &VarBind) {
    print!("OID: {} | Value: ", varbind.oid);
    match &varbind.value {
        ObjectSyntax::OctetString(val) => println!("{}", String::from_utf8_lossy(val)),
        ObjectSyntax::Integer(val) => println!("{val}"),
        ObjectSyntax::Counter32(val) => println!("{val}"),
        ObjectSyntax::Gauge32(val) => println!("{val}"),
        ObjectSyntax::TimeTicks(val) => println!("{val}"),
        ObjectSyntax::Counter64(val) => println!("{val}"),
        other => println!("{other:?}"),
    }
}
