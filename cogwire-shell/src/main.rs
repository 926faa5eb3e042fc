//! # Interactive CogServer Shell
//!
//! Purpose: Provide a line-oriented console for a CogServer s-expression
//! session, one command sent and one reply printed per line.
//!
//! ## Design Principles
//! 1. **Thin Wrapper**: All protocol behavior lives in the client crate;
//!    this binary only shuttles lines between stdin and the session.
//! 2. **Local Dot-Commands**: `.stats`, `.barrier`, and `.quit` are handled
//!    client-side and never reach the server.
//! 3. **Honest Exit**: A dropped session ends the loop with a message
//!    instead of spinning on a dead connection.

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use cogwire_client::{ClientError, CogClient};
use tracing_subscriber::EnvFilter;

fn main() {
    let uri = match env::args().nth(1) {
        Some(uri) => uri,
        None => {
            eprintln!("usage: cogwire-shell cog://host[:port]/space");
            process::exit(2);
        }
    };

    if let Err(err) = run(&uri) {
        eprintln!("cogwire-shell failed: {err:#}");
        process::exit(1);
    }
}

fn run(uri: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let client = CogClient::new(uri)?;
    client
        .open()
        .with_context(|| format!("opening session to {}", uri))?;
    println!("connected to {}; .quit to exit", uri);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("cog> ");
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim_end_matches(['\r', '\n']);
        if command.is_empty() {
            continue;
        }
        match command {
            ".quit" => break,
            ".stats" => {
                println!("{}", client.stats());
                continue;
            }
            ".barrier" => {
                client.barrier()?;
                println!("ok");
                continue;
            }
            _ => {}
        }

        client.send(&format!("{}\n", command))?;
        match client.receive() {
            Ok(reply) => {
                print!("{}", reply);
                if !reply.ends_with('\n') {
                    println!();
                }
            }
            Err(ClientError::PeerClosed) => {
                eprintln!("cogserver closed the connection");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    client.close();
    Ok(())
}
