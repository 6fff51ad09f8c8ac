//! hotkv CLI Client
//!
//! Command-line interface for interacting with hotkv-server.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hotkv::protocol::{
    decode_stats, read_response, write_command, Command, Response, Status, MAX_PAYLOAD_SIZE,
};
use hotkv::{HotKvError, Result};

/// hotkv CLI
#[derive(Parser, Debug)]
#[command(name = "hotkv-cli")]
#[command(about = "CLI for the hotkv lookup store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7420")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up the value for a key
    Lookup {
        /// The key to look up
        key: String,
    },

    /// Replace the whole table with a two-column file (push-only servers)
    Push {
        /// File to upload
        file: PathBuf,
    },

    /// Show store statistics
    Stats,

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let command = match &args.command {
        Commands::Lookup { key } => Command::Lookup { key: key.clone() },
        Commands::Push { file } => Command::Push {
            document: read_document(file)?,
        },
        Commands::Stats => Command::Stats,
        Commands::Ping => Command::Ping,
    };

    let response = send(&args.server, &command)?;

    match response.status {
        Status::Ok => {
            print_ok(&args.command, &response)?;
            Ok(ExitCode::SUCCESS)
        }
        Status::NotFound => {
            if let Commands::Lookup { key } = &args.command {
                println!("Key {} not found", key);
            }
            Ok(ExitCode::from(2))
        }
        Status::Error | Status::Invalid => {
            eprintln!(
                "{:?}: {}",
                response.status,
                response.message().unwrap_or_default()
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Read a push document, refusing files the protocol cannot frame
fn read_document(file: &Path) -> Result<Vec<u8>> {
    let size = fs::metadata(file)?.len();
    if size > u64::from(MAX_PAYLOAD_SIZE) {
        return Err(HotKvError::Protocol(format!(
            "{} is {} bytes, larger than the {} byte push limit",
            file.display(),
            size,
            MAX_PAYLOAD_SIZE
        )));
    }
    Ok(fs::read(file)?)
}

fn send(server: &str, command: &Command) -> Result<Response> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn print_ok(command: &Commands, response: &Response) -> Result<()> {
    match command {
        Commands::Stats => {
            let stats = decode_stats(response.payload.as_deref().unwrap_or_default())?;
            println!("mode:            {:?}", stats.mode);
            match &stats.location {
                Some(location) => println!("location:        {}", location.display()),
                None => println!("location:        -"),
            }
            println!("entries:         {}", stats.entries);
            println!("ready:           {}", stats.ready);
            println!("reloads applied: {}", stats.reloads_applied);
            println!("reloads failed:  {}", stats.reloads_failed);
        }
        Commands::Push { .. } => {
            println!("Store updated: {} entries", response.message().unwrap_or_default());
        }
        Commands::Lookup { .. } | Commands::Ping => {
            println!("{}", response.message().unwrap_or_default());
        }
    }
    Ok(())
}
