use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stompsync_client::{run_session, ClientConfig, Delegate};
use tracing::info;

use crate::cmd::{parse_duration, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_invalidation, OutputFormat};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let addr = resolve(&args.addr)?;
    let config = ClientConfig {
        min_heartbeat: parse_duration(&args.min_heartbeat)?,
        heartbeat_grace: parse_duration(&args.grace)?,
        connect_timeout: parse_duration(&args.connect_timeout)?,
        ..ClientConfig::default()
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printer = Printer {
        login: args.login,
        vhost: args.vhost,
        channel: args.channel,
        format,
        count: args.count,
        printed: 0,
        running: running.clone(),
    };

    run_session(addr, &mut printer, config, &running)
        .map_err(|err| client_error("session ended", err))?;
    info!(printed = printer.printed, "watch finished");
    Ok(SUCCESS)
}

/// Prints invalidations and stops the session once `count` have arrived.
struct Printer {
    login: String,
    vhost: String,
    channel: String,
    format: OutputFormat,
    count: Option<usize>,
    printed: usize,
    running: Arc<AtomicBool>,
}

impl Delegate for Printer {
    fn login(&self) -> String {
        self.login.clone()
    }

    fn vhost(&self) -> String {
        self.vhost.clone()
    }

    fn channel(&self) -> String {
        self.channel.clone()
    }

    fn on_connected(&mut self) {
        info!(channel = %self.channel, "subscribed");
    }

    fn on_closed(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn on_invalidation(&mut self, payload: Vec<u8>) {
        if self.count.is_some_and(|count| self.printed >= count) {
            return;
        }
        self.printed += 1;
        print_invalidation(self.printed, &self.channel, &payload, self.format);

        if self.count.is_some_and(|count| self.printed >= count) {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

fn resolve(addr: &str) -> CliResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|err| CliError::new(USAGE, format!("cannot resolve {addr}: {err}")))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("{addr} resolved to no addresses")))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
