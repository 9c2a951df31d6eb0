//! Interactive administrative client for a remote knowledge-base service.
//!
//! Statements in a small SQL-like language are lexed and parsed by
//! `kbctl_core`, then executed against the server through `kbctl_client`.

mod table;

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::{Parser as ClapParser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kbctl_client::{
    required_mode, BenchRunner, Dispatcher, HttpClient, Mode, Output, Transport,
    DEFAULT_HOST, DEFAULT_PORT,
};
use kbctl_core::{Command, CommandKind, Parser, Statement};

const DEFAULT_ADMIN_ACCOUNT: &str = "admin@kb.local";

const HELP: &str = r#"Statements end with ';'. Keywords are case-insensitive.

Session
  LOGIN USER '<email>';                 re-authenticate as another account
  PING;                                 health-check the server
  SHOW VERSION;

Admin mode
  LIST SERVICES; | SHOW SERVICE <id>;
  STARTUP|SHUTDOWN|RESTART SERVICE <id>;
  LIST USERS; | SHOW USER '<email>'; | CREATE USER '<email>' '<password>';
  DROP USER '<email>'; | ALTER USER PASSWORD '<email>' '<new>';
  ALTER USER ACTIVE '<email>' on|off; | ALTER USER '<email>' SET ROLE <role>;
  GRANT ADMIN '<email>'; | REVOKE ADMIN '<email>';
  CREATE ROLE <role> [DESCRIPTION '<text>']; | DROP ROLE <role>;
  ALTER ROLE <role> SET DESCRIPTION '<text>'; | LIST ROLES; | SHOW ROLE <role>;
  GRANT <action,...> ON <resource> TO ROLE <role>;
  REVOKE <action,...> ON <resource> FROM ROLE <role>;
  SHOW USER PERMISSION '<email>';
  GENERATE KEY FOR USER '<email>'; | LIST KEYS OF '<email>';
  DROP KEY '<key>' OF '<email>';
  SET VAR <name> <value>; | SHOW VAR <name>; | LIST VARS;
  LIST CONFIGS; | LIST ENVS;
  LIST DATASETS OF '<email>'; | LIST AGENTS OF '<email>';

User mode
  SHOW CURRENT USER;
  CREATE DATASET '<name>' WITH EMBEDDING '<model>' PARSER '<type>';
  CREATE DATASET '<name>' WITH EMBEDDING '<model>' PIPELINE '<id>';
  DROP DATASET '<name>'; | LIST DATASETS; | LIST FILES OF DATASET '<name>';
  IMPORT '<path,...>' INTO DATASET '<name>';
  PARSE DATASET '<name>' SYNC|ASYNC; | PARSE '<doc,...>' OF DATASET '<name>';
  SEARCH '<question>' ON DATASETS '<name,...>';
  LIST AGENTS; | LIST CHATS; | CREATE CHAT '<name>'; | DROP CHAT '<name>';
  CREATE MODEL PROVIDER '<name>' '<api key>'; | DROP MODEL PROVIDER '<name>';
  LIST MODEL PROVIDERS; | LIST DEFAULT MODELS;
  SET DEFAULT LLM|VLM|EMBEDDING|RERANKER|ASR|TTS '<model>';
  RESET DEFAULT LLM|VLM|EMBEDDING|RERANKER|ASR|TTS;

Load testing
  BENCHMARK <concurrency> <iterations> <user statement>;

Meta commands
  \? \h \help    this help
  \q \quit \exit leave the session
"#;

#[derive(Debug, ClapParser)]
#[command(
    name = "kbctl",
    version,
    about = "Administrative command-line client for a remote knowledge-base service"
)]
struct Cli {
    /// Server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port.
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Account to log in as. Defaults to the built-in administrator in
    /// admin mode; required in user mode.
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password. Prompted interactively when omitted.
    #[arg(short = 'w', long)]
    password: Option<String>,

    /// Which side of the service to talk to.
    #[arg(short = 'm', long, value_enum, default_value_t = ModeArg::Admin)]
    mode: ModeArg,

    /// Connect over TLS.
    #[arg(long)]
    https: bool,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// A single statement to run after login, then exit.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Admin,
    User,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Mode {
        match arg {
            ModeArg::Admin => Mode::Admin,
            ModeArg::User => Mode::User,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

enum LineResult {
    Continue,
    Quit,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mode: Mode = cli.mode.into();

    let mut transport = Transport::new(cli.host.clone(), cli.port);
    transport.https = cli.https;
    transport.accept_invalid_certs = cli.insecure;

    let email = match (&cli.username, mode) {
        (Some(name), _) => name.clone(),
        (None, Mode::Admin) => DEFAULT_ADMIN_ACCOUNT.to_owned(),
        (None, Mode::User) => bail!("--username is required in user mode"),
    };

    let single = cli.command.join(" ");
    let single = (!single.trim().is_empty()).then_some(single);

    let mut http = HttpClient::new(transport)?;
    let attempts = if single.is_some() || cli.password.is_some() {
        1
    } else {
        3
    };
    let mut logged_in = false;
    for attempt in 0..attempts {
        let password = match &cli.password {
            Some(pw) => pw.clone(),
            None => prompt(&format!("Password for {email}: "))?,
        };
        match http.login(mode, &email, &password) {
            Ok(()) => {
                logged_in = true;
                break;
            }
            Err(err) => {
                println!("Error: {err}");
                debug!(attempt, "login attempt failed");
            }
        }
    }
    if !logged_in {
        bail!("login failed for {email}");
    }
    println!("Connected to {}:{} as {email} ({} mode)", cli.host, cli.port, mode.as_str());

    let mut dispatcher = Dispatcher::new(http, mode);
    match single {
        Some(line) => {
            run_line(&mut dispatcher, &line);
            Ok(())
        }
        None => repl(&mut dispatcher),
    }
}

fn repl(dispatcher: &mut Dispatcher) -> anyhow::Result<()> {
    println!("Type \\? for help, \\q to quit.");
    let stdin = io::stdin();
    loop {
        print!("kbctl> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            return Ok(());
        }
        match run_line(dispatcher, line.trim()) {
            LineResult::Quit => return Ok(()),
            LineResult::Continue => {}
        }
    }
}

/// Parses and executes one input line. Every failure is reported as a
/// single `Error:` line; nothing here ends the session except `\q`.
fn run_line(dispatcher: &mut Dispatcher, line: &str) -> LineResult {
    match Parser::parse_line(line) {
        Ok(None) => LineResult::Continue,
        Ok(Some(Command::Meta { name, args })) => run_meta(&name, &args),
        Ok(Some(Command::Statement(stmt))) => {
            run_statement(dispatcher, &stmt);
            LineResult::Continue
        }
        Ok(Some(Command::Benchmark {
            concurrency,
            iterations,
            inner,
        })) => {
            run_benchmark(dispatcher, concurrency, iterations, &inner);
            LineResult::Continue
        }
        Err(err) => {
            println!("Error: {err}");
            LineResult::Continue
        }
    }
}

fn run_meta(name: &str, args: &[String]) -> LineResult {
    match name {
        "q" | "quit" | "exit" => LineResult::Quit,
        "?" | "h" | "help" => {
            println!("{HELP}");
            LineResult::Continue
        }
        other => {
            println!("Unknown meta command: \\{other} {}", args.join(" "));
            LineResult::Continue
        }
    }
}

fn run_statement(dispatcher: &mut Dispatcher, stmt: &Statement) {
    if let Some(required) = required_mode(stmt.kind) {
        if required != dispatcher.mode() {
            println!(
                "This command is only allowed in {} mode",
                required.as_str().to_uppercase()
            );
        }
    }
    if stmt.kind == CommandKind::LoginUser {
        relogin(dispatcher, stmt);
        return;
    }
    match dispatcher.execute(stmt) {
        Ok(Output::Rows(rows)) => table::print_rows(&rows),
        Ok(Output::Message(message)) => println!("{message}"),
        Ok(Output::None) => {}
        Err(err) => println!("Error: {err}"),
    }
}

/// Handles `LOGIN USER '<email>';` by prompting for that account's
/// password and swapping the session credential in place.
fn relogin(dispatcher: &mut Dispatcher, stmt: &Statement) {
    let email = match stmt.str_param("email") {
        Some(email) => email.to_owned(),
        None => {
            println!("Error: missing email");
            return;
        }
    };
    let password = match prompt(&format!("Password for {email}: ")) {
        Ok(pw) => pw,
        Err(err) => {
            println!("Error: {err}");
            return;
        }
    };
    let mode = dispatcher.mode();
    match dispatcher.http_mut().login(mode, &email, &password) {
        Ok(()) => println!("Logged in as {email}"),
        Err(err) => println!("Error: {err}"),
    }
}

fn run_benchmark(dispatcher: &Dispatcher, concurrency: u64, iterations: u64, inner: &Statement) {
    println!(
        "command: {}, Concurrency: {concurrency}, iterations: {iterations}",
        inner.kind
    );
    let runner = BenchRunner::new(
        dispatcher.http().transport().clone(),
        dispatcher.http().token().map(str::to_owned),
        dispatcher.mode(),
    );
    match runner.run(inner, concurrency, iterations) {
        Ok(summary) => {
            println!(
                "total commands: {}, duration: {:.3}s, QPS: {:.2}, success: {}, failure: {}",
                summary.total_commands,
                summary.duration.as_secs_f64(),
                summary.qps(),
                summary.success_count,
                summary.failure_count
            );
        }
        Err(err) => println!("Error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_connection_arguments() {
        let cli = Cli::parse_from([
            "kbctl", "--host", "kb.example", "-p", "9999", "-m", "user", "-u", "a@b.com",
        ]);
        assert_eq!(cli.host, "kb.example");
        assert_eq!(cli.port, 9999);
        assert_eq!(cli.mode, ModeArg::User);
        assert_eq!(cli.username.as_deref(), Some("a@b.com"));
        assert!(cli.command.is_empty());
    }

    #[test]
    fn trailing_words_form_a_single_command() {
        let cli = Cli::parse_from(["kbctl", "LIST", "USERS;"]);
        assert_eq!(cli.command.join(" "), "LIST USERS;");
    }

    #[test]
    fn defaults_match_the_server() {
        let cli = Cli::parse_from(["kbctl"]);
        assert_eq!(cli.host, DEFAULT_HOST);
        assert_eq!(cli.port, DEFAULT_PORT);
        assert_eq!(cli.mode, ModeArg::Admin);
    }
}
