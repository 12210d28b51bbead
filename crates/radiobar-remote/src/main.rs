use std::io::ErrorKind;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use radiobar_proto::platform;
use radiobar_proto::protocol::send_command;

/// Send one command to a running RadioBar and print its reply.
#[derive(Parser, Debug)]
#[command(name = "radiobar-remote", version)]
struct Args {
    /// Command: a station number, off, on, resume, pause, toggle, info,
    /// nowplaying, sleep, wake. An empty string toggles.
    #[arg(allow_hyphen_values = true)]
    command: String,

    #[arg(long, default_value = platform::default_remote_host())]
    host: String,

    #[arg(long, default_value_t = platform::DEFAULT_REMOTE_PORT)]
    port: u16,

    /// Program (and arguments) used to start RadioBar if nothing is listening.
    #[arg(long, value_delimiter = ' ')]
    launch: Option<Vec<String>>,

    /// Wait after launching before the single retry.
    #[arg(long, default_value_t = 5)]
    retry_delay_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args).await {
        Ok(reply) => {
            println!("{}", reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<String> {
    let address = format!("{}:{}", args.host, args.port);

    match send_command(&address, &args.command).await {
        Ok(reply) => Ok(reply),
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
            let launch = args
                .launch
                .clone()
                .unwrap_or_else(platform::default_launch_command);
            launch_app(&launch)?;
            tokio::time::sleep(Duration::from_secs(args.retry_delay_secs)).await;
            Ok(send_command(&address, &args.command).await?)
        }
        Err(e) => Err(e.into()),
    }
}

fn launch_app(command: &[String]) -> anyhow::Result<()> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty launch command"))?;
    std::process::Command::new(program)
        .args(rest)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| anyhow::anyhow!("could not launch {}: {}", program, e))?;
    Ok(())
}
