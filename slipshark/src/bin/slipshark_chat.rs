// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Terminal chat client for the research relay.
//
// Reads questions from stdin, spends one daily query per question, and
// prints the answer as it streams. Once the quota is gone the prompt
// switches to waitlist signup.

use clap::Parser;
use slipshark::client::{ClientError, StreamingCallbacks, StreamingClient};
use slipshark::config::SecretString;
use slipshark::rate_limit::RateLimiter;
use slipshark::session::{user_friendly_error, ChatSession};
use slipshark::storage::{resolve_store_path, FileStore, KeyValueStore, MemoryStore};
use slipshark::waitlist::{join_waitlist, RestWaitlist};

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "slipshark-chat", about = "Ask the SlipShark research assistant")]
struct Cli {
    /// Relay endpoint URL
    #[arg(
        long,
        default_value = "http://127.0.0.1:8787/api/research",
        env = "SLIPSHARK_RELAY_URL"
    )]
    relay_url: String,

    /// Path of the quota store (defaults to $SLIPSHARK_STORE or the data dir)
    #[arg(long)]
    store: Option<String>,

    /// Queries allowed per local calendar day
    #[arg(long, default_value_t = slipshark::rate_limit::DAILY_QUERY_LIMIT, env = "SLIPSHARK_DAILY_LIMIT")]
    daily_limit: u32,

    /// Base URL of the waitlist datastore
    #[arg(long, env = "SLIPSHARK_WAITLIST_URL")]
    waitlist_url: Option<String>,

    /// Public key for the waitlist datastore
    #[arg(long, env = "SLIPSHARK_WAITLIST_KEY", hide_env_values = true)]
    waitlist_key: Option<String>,

    /// Ask one question and exit
    #[arg(long)]
    query: Option<String>,
}

/// Prints chunks as they arrive while the session keeps the transcript.
struct TerminalView<'a> {
    session: &'a mut ChatSession,
}

impl StreamingCallbacks for TerminalView<'_> {
    fn on_chunk(&mut self, chunk: &str) {
        print!("{chunk}");
        let _ = std::io::stdout().flush();
        self.session.on_chunk(chunk);
    }

    fn on_error(&mut self, error: ClientError) {
        println!("\n{}", user_friendly_error(&error));
        self.session.on_error(error);
    }

    fn on_complete(&mut self, full_response: String) {
        println!();
        self.session.on_complete(full_response);
    }
}

struct App {
    client: StreamingClient,
    limiter: RateLimiter,
    waitlist: Option<RestWaitlist>,
    session: ChatSession,
    waitlist_mode: bool,
}

impl App {
    async fn ask(&mut self, question: &str) {
        if self.session.submit_user_message(question).is_none() {
            return;
        }

        match self.limiter.try_consume_one() {
            Ok(true) => {}
            Ok(false) => {
                self.session.record_limit_reached(self.limiter.daily_limit());
                if let Some(notice) = self.session.messages().last() {
                    println!("{}", notice.content);
                }
                self.waitlist_mode = true;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to record query");
                println!("Error: could not record query usage ({e})");
                return;
            }
        }

        self.session.begin_response();

        // Ctrl-C stops the current answer, not the program.
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            ctrl_c().await;
            trigger.cancel();
        });

        let mut view = TerminalView {
            session: &mut self.session,
        };
        self.client
            .send_query_cancellable(question, &mut view, &cancel)
            .await;
        watcher.abort();

        let remaining = self.limiter.remaining_queries();
        println!("[{remaining} of {} queries left today]", self.limiter.daily_limit());
        if remaining == 0 {
            self.waitlist_mode = true;
        }
    }

    async fn submit_email(&mut self, email: &str) {
        let Some(waitlist) = &self.waitlist else {
            println!("The waitlist is not configured. Set SLIPSHARK_WAITLIST_URL and SLIPSHARK_WAITLIST_KEY.");
            self.waitlist_mode = false;
            return;
        };

        match join_waitlist(waitlist, email).await {
            Ok(()) => {
                println!("Thanks! You're on the waitlist.");
                self.waitlist_mode = false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "waitlist signup failed");
                println!("{}", e.user_message());
            }
        }
    }

    fn prompt(&self) {
        if self.waitlist_mode {
            print!("email (or /back)> ");
        } else {
            print!("> ");
        }
        let _ = std::io::stdout().flush();
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn KeyValueStore> = match resolve_store_path(cli.store.as_deref()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using file store");
            Arc::new(FileStore::new(path))
        }
        None => {
            tracing::warn!("no data directory found, quota will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let waitlist = match (cli.waitlist_url, cli.waitlist_key) {
        (Some(url), Some(key)) => Some(RestWaitlist::new(
            reqwest::Client::new(),
            url,
            SecretString::new(key),
        )),
        _ => None,
    };

    let mut app = App {
        client: StreamingClient::http(cli.relay_url),
        limiter: RateLimiter::new(store).with_limit(cli.daily_limit),
        waitlist,
        session: ChatSession::new(),
        waitlist_mode: false,
    };

    if let Some(question) = cli.query {
        app.ask(&question).await;
        return;
    }

    println!(
        "SlipShark research. {} of {} queries left today. /waitlist to join the waitlist, /quit to exit.",
        app.limiter.remaining_queries(),
        app.limiter.daily_limit()
    );

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    app.prompt();
    loop {
        let line = match next_input(&mut lines, ctrl_c()).await {
            Input::Line(line) => line,
            Input::Interrupted => {
                println!();
                break;
            }
            Input::Closed => break,
        };
        let input = line.trim();

        match input {
            "" => {}
            "/quit" => break,
            "/waitlist" => app.waitlist_mode = true,
            "/back" => app.waitlist_mode = false,
            _ if app.waitlist_mode => app.submit_email(input).await,
            _ => app.ask(input).await,
        }
        app.prompt();
    }
}

/// What the idle prompt received.
#[derive(Debug, PartialEq)]
enum Input {
    Line(String),
    Interrupted,
    Closed,
}

/// Wait for the next line or an interrupt, whichever comes first.
///
/// Once any Ctrl-C listener has been created tokio owns SIGINT for the rest
/// of the process, so the idle prompt must listen too or Ctrl-C stops
/// quitting the program.
async fn next_input<L, I>(lines: &mut L, interrupt: I) -> Input
where
    L: Stream<Item = std::io::Result<String>> + Unpin,
    I: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = interrupt => Input::Interrupted,
        line = lines.next() => match line {
            Some(Ok(line)) => Input::Line(line),
            Some(Err(e)) => {
                tracing::error!(error = %e, "failed to read stdin");
                Input::Closed
            }
            None => Input::Closed,
        },
    }
}

/// Resolves on Ctrl-C. Never resolves if the listener cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
