//! Console front end
//!
//! Line-oriented command surface over the session shell. Parsing and
//! rendering are pure; `run_console` wires them to stdin/stdout.

use std::fmt::Write as _;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::PrerequisiteStatus;
use crate::events::{event_names, HostEvent};
use crate::shell::{format_rate, DashboardView, LoginView, SessionShell, ShellView};
use crate::vpn::Server;

pub const HELP: &str = "\
Commands:
  login <email> <password>   sign in
  toggle                     connect or disconnect
  connect | disconnect
  select <id>                choose a server
  servers                    list servers
  status                     show the current screen
  logout
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Login { email: String, password: String },
    Toggle,
    Connect,
    Disconnect,
    Select(String),
    Servers,
    Status,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = words.collect();

    let command = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("login", [email, password]) => ConsoleCommand::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("login", _) => return Err(CommandError::Usage("login <email> <password>")),
        ("select", [id]) => ConsoleCommand::Select(id.to_string()),
        ("select", _) => return Err(CommandError::Usage("select <id>")),
        ("toggle", []) => ConsoleCommand::Toggle,
        ("connect", []) => ConsoleCommand::Connect,
        ("disconnect", []) => ConsoleCommand::Disconnect,
        ("servers", []) => ConsoleCommand::Servers,
        ("status", []) => ConsoleCommand::Status,
        ("logout", []) => ConsoleCommand::Logout,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

pub fn render_server_line(server: &Server, selected: bool) -> String {
    format!(
        "{} [{}] {:<10} {:<15} {:>4} ms ({:?})  load {:>3}% ({:?})",
        if selected { "*" } else { " " },
        server.id,
        server.name,
        server.country,
        server.ping,
        server.ping_quality(),
        server.load,
        server.load_level(),
    )
}

fn render_login(view: &LoginView) -> String {
    let mut out = String::from("Sign in to SecureVPN");
    if view.busy {
        out.push_str("\n  Signing in...");
    }
    match &view.prerequisite {
        PrerequisiteStatus::Unknown => {}
        PrerequisiteStatus::Available => out.push_str("\n  VPN CLI detected"),
        PrerequisiteStatus::Missing { download_url } => {
            let _ = write!(out, "\n  VPN CLI not found. Download it from {}", download_url);
        }
    }
    out
}

fn render_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Signed in as {}", view.user);
    let _ = writeln!(out, "Status: {}", view.status_line);
    if let Some(location) = &view.connected_to {
        let _ = writeln!(out, "Connected to {}", location);
    }
    let _ = writeln!(
        out,
        "Server: {}, {} ({})",
        view.selected_server.server.name,
        view.selected_server.server.country,
        view.selected_server.server.location
    );
    let _ = writeln!(out, "Duration: {}", view.elapsed);
    let _ = writeln!(
        out,
        "Download: {}  Upload: {}",
        format_rate(view.download_rate),
        format_rate(view.upload_rate)
    );
    let _ = write!(out, "[{}]", view.toggle_label);
    out
}

pub fn render_view(view: &ShellView) -> String {
    match view {
        ShellView::Login(login) => render_login(login),
        ShellView::Dashboard(dashboard) => render_dashboard(dashboard),
    }
}

fn render_host_event(event: &HostEvent) -> Option<String> {
    match event.name.as_str() {
        event_names::SERVER_STARTED => {
            let port = event.payload.get("port")?.as_u64()?;
            Some(format!("API server started on port {}", port))
        }
        _ => None,
    }
}

/// Run one command against the shell. Returns `false` when the console
/// should exit.
pub async fn execute(shell: &mut SessionShell, command: ConsoleCommand) -> bool {
    let outcome = match command {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Status => Ok(render_view(&shell.view())),
        ConsoleCommand::Servers => {
            let selected = shell.controller().map(|c| c.selected_server().id);
            Ok(shell
                .servers()
                .iter()
                .map(|s| render_server_line(s, Some(s.id) == selected))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ConsoleCommand::Login { email, password } => {
            println!("Signing in...");
            let signed_in = shell.login(&email, &password).await.map(|_| ());
            signed_in.map(|()| render_view(&shell.view()))
        }
        ConsoleCommand::Logout => {
            shell.logout();
            Ok(render_view(&shell.view()))
        }
        ConsoleCommand::Toggle => shell.toggle().map(|_| render_view(&shell.view())),
        ConsoleCommand::Connect => shell.connect().map(|_| render_view(&shell.view())),
        ConsoleCommand::Disconnect => shell.disconnect().map(|_| render_view(&shell.view())),
        ConsoleCommand::Select(id) => shell
            .select_server(&id)
            .map(|s| format!("Selected {}", s.display_name())),
    };

    match outcome {
        Ok(text) => println!("{}", text),
        Err(e) => println!("Error: {}", e),
    }
    true
}

/// Read commands from stdin until `quit` or EOF, printing host events as
/// they arrive. Subscribe before starting the emitters so early events are
/// not missed.
pub async fn run_console(
    shell: &mut SessionShell,
    mut host_events: broadcast::Receiver<HostEvent>,
) {
    let mut events_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !shell.check_prerequisite().await {
        debug!("VPN CLI missing; sign-in remains available");
    }
    println!("{}", render_view(&shell.view()));
    println!("Type 'help' for commands.");

    loop {
        tokio::select! {
            event = host_events.recv(), if events_open => match event {
                Ok(event) => {
                    if let Some(text) = render_host_event(&event) {
                        println!("{}", text);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Console missed {} host events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    events_open = false;
                }
            },
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read console input: {}", e);
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(command) => {
                        if !execute(shell, command).await {
                            break;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }
}
