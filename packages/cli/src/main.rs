//! `eidagent`: command-line driver for the local eID agent.
//!
//! One subcommand per protocol command. Connection settings come from global
//! flags or their `EIDAGENT_*` environment variables; anything left unset
//! keeps the client library's default.
//!
//! Replies are printed as pretty JSON on stdout; logs go to stderr.
//!
//! Exit codes: `0` success, `1` the command failed (agent, HTTP or transport
//! failure), `2` usage or configuration error.
//!
//! ```sh
//! export EIDAGENT_TOKEN_URL=https://service.example/tcToken
//! eidagent readers
//! eidagent --session s1 auth
//! eidagent --session s1 accept
//! eidagent --session s1 pin 123456
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use eidagent_client::{AgentClient, Result};
use serde::Serialize;

/// eidagent: talk to a local eID agent
#[derive(Parser)]
#[command(name = "eidagent", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Connection {
    /// URL scheme: http | https
    #[arg(long, global = true, env = "EIDAGENT_SCHEME")]
    scheme: Option<String>,

    /// Basic-auth user embedded in the agent URL.
    #[arg(long, global = true, env = "EIDAGENT_USERNAME")]
    username: Option<String>,

    /// Basic-auth password; requires --username.
    #[arg(long, global = true, env = "EIDAGENT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, global = true, env = "EIDAGENT_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "EIDAGENT_PORT")]
    port: Option<u32>,

    /// Path of the agent's command endpoint.
    #[arg(long, global = true, env = "EIDAGENT_PATH")]
    path: Option<String>,

    /// Query key under which the token URL is passed.
    #[arg(long, global = true, env = "EIDAGENT_TOKEN_URL_KEY")]
    token_url_key: Option<String>,

    /// Service provider's TC token URL.
    #[arg(long, global = true, env = "EIDAGENT_TOKEN_URL")]
    token_url: Option<String>,

    /// Skip TLS certificate and hostname verification.
    #[arg(long, global = true, env = "EIDAGENT_INSECURE")]
    insecure: bool,

    /// Cookie-jar file prefix; the session id is appended.
    #[arg(long, global = true, env = "EIDAGENT_COOKIE_PATH", value_name = "PREFIX")]
    cookie_path: Option<PathBuf>,

    /// Session id. Reuse it across invocations to continue a workflow.
    #[arg(long, global = true, env = "EIDAGENT_SESSION")]
    session: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Agent version information (GET_INFO).
    Info,

    /// Show the API level, or switch it with --set (GET/SET_API_LEVEL).
    ApiLevel {
        #[arg(long, value_name = "LEVEL")]
        set: Option<u32>,
    },

    /// One reader by name (GET_READER).
    Reader { name: String },

    /// All readers (GET_READER_LIST).
    Readers,

    /// Start an authentication workflow with the token URL (RUN_AUTH).
    Auth,

    /// Show the requested access rights, or choose optional ones with --chat
    /// (GET/SET_ACCESS_RIGHTS). `--chat` with no values deselects all.
    AccessRights {
        #[arg(long, num_args = 0.., value_name = "RIGHT")]
        chat: Option<Vec<String>>,
    },

    /// The service provider's certificate (GET_CERTIFICATE).
    Certificate,

    /// Abort the running workflow (CANCEL).
    Cancel,

    /// Accept the access rights (ACCEPT).
    Accept,

    /// Enter the PIN (SET_PIN).
    Pin { value: String },

    /// Enter the CAN (SET_CAN).
    Can { value: String },

    /// Enter the PUK (SET_PUK).
    Puk { value: String },

    /// Print the agent URL and the token URL without contacting the agent.
    Url,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eidagent=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = connect(cli.connection);

    match cli.command {
        Command::Info => emit(client.get_info()),
        Command::ApiLevel { set: None } => emit(client.get_api_level()),
        Command::ApiLevel { set: Some(level) } => emit(client.set_api_level(level)),
        Command::Reader { name } => emit(client.get_reader(&name)),
        Command::Readers => emit(client.get_reader_list()),
        Command::Auth => emit(client.run_auth()),
        Command::AccessRights { chat: None } => emit(client.get_access_rights()),
        Command::AccessRights { chat: Some(chat) } => emit(client.set_access_rights(chat)),
        Command::Certificate => emit(client.get_certificate()),
        Command::Cancel => emit(client.cancel()),
        Command::Accept => emit(client.accept()),
        Command::Pin { value } => emit(client.set_pin(&value)),
        Command::Can { value } => emit(client.set_can(&value)),
        Command::Puk { value } => emit(client.set_puk(&value)),
        Command::Url => {
            let endpoint = client.endpoint();
            emit(Ok(serde_json::json!({
                "url": endpoint.build_url(None),
                "token_url": endpoint.build_token_url(),
            })))
        }
    }
}

/// Build a client from the connection flags. Any rejected setting is fatal.
fn connect(c: Connection) -> AgentClient {
    let token_url = c
        .token_url
        .unwrap_or_else(|| fatal("--token-url (or EIDAGENT_TOKEN_URL) is required"));
    let mut client = AgentClient::new(token_url, c.session);
    let endpoint = client.endpoint_mut();

    if let Some(scheme) = c.scheme {
        endpoint.set_scheme(scheme).unwrap_or_else(|e| setting_error("scheme", e));
    }
    if let Some(username) = c.username {
        endpoint
            .set_username(username)
            .unwrap_or_else(|e| setting_error("username", e));
    }
    if let Some(password) = c.password {
        endpoint
            .set_password(password)
            .unwrap_or_else(|e| setting_error("password", e));
    }
    if let Some(host) = c.host {
        endpoint.set_host(host).unwrap_or_else(|e| setting_error("host", e));
    }
    if let Some(port) = c.port {
        endpoint.set_port(port).unwrap_or_else(|e| setting_error("port", e));
    }
    if let Some(path) = c.path {
        endpoint.set_path(path).unwrap_or_else(|e| setting_error("path", e));
    }
    if let Some(key) = c.token_url_key {
        endpoint
            .set_token_url_key(key)
            .unwrap_or_else(|e| setting_error("token URL key", e));
    }
    if c.insecure {
        endpoint
            .set_verify_tls(false)
            .unwrap_or_else(|e| setting_error("TLS verification", e));
    }
    if let Some(path) = c.cookie_path {
        endpoint
            .set_cookie_path(path)
            .unwrap_or_else(|e| setting_error("cookie path", e));
    }

    tracing::debug!(session = client.session().id(), "client ready");
    client
}

/// Print a successful reply as JSON, or report the failure and exit 1.
fn emit<T: Serialize>(result: Result<T>) {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{json}"),
            Err(e) => fatal(&format!("failed to encode reply: {e}")),
        },
        Err(e) => {
            match e.code() {
                Some(code) => eprintln!("eidagent: {e} (code {code})"),
                None => eprintln!("eidagent: {e}"),
            }
            process::exit(1);
        }
    }
}

fn setting_error(what: &str, e: eidagent_client::Error) -> ! {
    fatal(&format!("invalid {what}: {e}"))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("eidagent: {}", msg);
    process::exit(2);
}
