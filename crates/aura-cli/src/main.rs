mod bridge;
mod ui;

use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use aura_core::chat::QuickReply;
use aura_core::config::Config;
use aura_core::FileSlot;
use aura_core::KeyValueSlot;
use aura_core::SnapshotStore;
use aura_exec::HttpInvoiceClient;
use aura_exec::HttpWebhookClient;
use aura_exec::Session;
use aura_exec::SessionServices;
use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;

use crate::bridge::TerminalBridge;
use crate::ui::ConsolePresenter;

#[derive(Parser, Debug)]
#[command(name = "aura", author, version, about = "Terminal client for the Aura coaching chat", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "aura.toml")]
    config: PathBuf,

    /// User id to act as (defaults to the guest slot)
    #[arg(short, long, global = true, env = "AURA_USER_ID")]
    user: Option<String>,

    /// Launch start parameter, e.g. `pay_plus`
    #[arg(long, global = true)]
    start_param: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print the stored chat, timeline and counters
    Show,
    /// Leave the splash screen; greets on first use
    Open,
    /// Send a message to the coach
    Send {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Pick one of the greeting quick replies
    Reply {
        #[arg(value_parser = parse_quick_reply)]
        choice: QuickReply,
    },
    /// Toggle the plan timeline
    Plan,
    /// Mark a plan item as done
    Complete { id: u32 },
    /// Buy the Plus subscription
    Pay,
    /// Print aura and the weekday activity series
    Activity,
    /// Interactive session
    Chat,
}

fn parse_quick_reply(value: &str) -> Result<QuickReply, String> {
    QuickReply::parse(value)
        .ok_or_else(|| format!("unknown quick reply `{value}`, expected question, technique or plan"))
}

#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Message(String),
    Reply(QuickReply),
    Complete(u32),
    TogglePlan,
    Pay,
    Activity,
    Show,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

fn parse_chat_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    match (name, arg) {
        ("quit" | "exit", _) => ChatInput::Quit,
        ("help", _) => ChatInput::Help,
        ("plan", None) => ChatInput::TogglePlan,
        ("pay", _) => ChatInput::Pay,
        ("activity", _) => ChatInput::Activity,
        ("show", _) => ChatInput::Show,
        ("reply", Some(choice)) => match QuickReply::parse(choice) {
            Some(reply) => ChatInput::Reply(reply),
            None => ChatInput::Invalid(format!("unknown quick reply `{choice}`")),
        },
        ("done", Some(id)) => match id.parse() {
            Ok(id) => ChatInput::Complete(id),
            Err(_) => ChatInput::Invalid(format!("not a plan item id: `{id}`")),
        },
        _ => ChatInput::Invalid(format!("unknown command `/{command}`")),
    }
}

const CHAT_HELP: &str = "Type a message, or: /reply <question|technique|plan>, /plan, /done <id>, /pay, /activity, /show, /quit";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aura=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(&cli.config);
    let data_dir = config
        .storage
        .resolved_data_dir()
        .context("no data directory available, set AURA_DATA_DIR")?;
    let slot = FileSlot::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
    let webhook =
        HttpWebhookClient::new(&config.webhook).context("invalid [webhook] configuration")?;
    let invoices =
        HttpInvoiceClient::new(&config.payment).context("invalid [payment] configuration")?;

    let mut session = Session::open(
        SnapshotStore::new(slot),
        SessionServices {
            bridge: Arc::new(TerminalBridge::new(cli.user, cli.start_param)),
            presenter: Box::new(ConsolePresenter),
            webhook: Box::new(webhook),
            invoices: Box::new(invoices),
        },
    );
    tracing::debug!(data_dir = %data_dir.display(), user = %session.state().user_id, "session ready");
    session.start().await;

    match cli.command {
        Command::Show => print!("{}", ui::render_state(session.state())),
        Command::Open => {
            let before = session.state().chat.messages.len();
            session.reveal_main().await;
            print_since(&session, before);
            print_quick_replies(&session);
        }
        Command::Send { text } => {
            let before = session.state().chat.messages.len();
            session.send_message(text.join(" ")).await;
            print_since(&session, before);
        }
        Command::Reply { choice } => {
            let before = session.state().chat.messages.len();
            session.select_quick_reply(choice).await;
            print_since(&session, before);
        }
        Command::Plan => toggle_plan(&mut session).await,
        Command::Complete { id } => complete(&mut session, id).await,
        Command::Pay => pay(&mut session).await,
        Command::Activity => print!("{}", ui::render_activity(&session.state().gamification)),
        Command::Chat => chat_loop(&mut session).await?,
    }

    session.close();
    Ok(())
}

fn print_since<S: KeyValueSlot>(session: &Session<S>, before: usize) {
    let messages = &session.state().chat.messages;
    if let Some(new) = messages.get(before..) {
        for message in new {
            println!("{}", ui::render_message(message));
        }
    }
}

fn print_quick_replies<S: KeyValueSlot>(session: &Session<S>) {
    let replies = session.state().chat.quick_replies();
    if !replies.is_empty() {
        let labels: Vec<&str> = replies.iter().map(|reply| reply.label()).collect();
        println!("quick replies: {}", labels.join(" | "));
    }
}

async fn toggle_plan<S: KeyValueSlot>(session: &mut Session<S>) {
    let before = session.state().chat.messages.len();
    session.toggle_plan_view().await;
    print_since(session, before);
    let state = session.state();
    if state.ui.show_timeline {
        print!("{}", ui::render_timeline(&state.timeline_view()));
    } else if state.has_plan() {
        println!("timeline hidden");
    }
}

async fn complete<S: KeyValueSlot>(session: &mut Session<S>, id: u32) {
    let before = session.state().gamification.aura;
    session.complete_plan_item(id).await;
    let after = session.state().gamification.aura;
    if after > before {
        println!("#{id} done, aura {after}");
    } else {
        println!("#{id} was already credited, aura {after}");
    }
}

async fn pay<S: KeyValueSlot>(session: &mut Session<S>) {
    session.request_plus().await;
    println!("{}", session.state().plus_label());
}

async fn chat_loop<S: KeyValueSlot>(session: &mut Session<S>) -> anyhow::Result<()> {
    let before = session.state().chat.messages.len();
    session.reveal_main().await;
    if before == 0 {
        print_since(session, before);
    } else {
        print!("{}", ui::render_state(session.state()));
    }
    print_quick_replies(session);
    println!("{CHAT_HELP}");

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        session.pump_bridge_events().await;

        match parse_chat_input(&input) {
            ChatInput::Quit => break,
            ChatInput::Empty => {}
            ChatInput::Help => println!("{CHAT_HELP}"),
            ChatInput::Invalid(reason) => println!("{reason}. {CHAT_HELP}"),
            ChatInput::Message(text) => {
                let before = session.state().chat.messages.len();
                session.send_message(text).await;
                print_since(session, before + 1);
            }
            ChatInput::Reply(reply) => {
                let before = session.state().chat.messages.len();
                session.select_quick_reply(reply).await;
                print_since(session, before);
            }
            ChatInput::Complete(id) => complete(session, id).await,
            ChatInput::TogglePlan => toggle_plan(session).await,
            ChatInput::Pay => pay(session).await,
            ChatInput::Activity => print!("{}", ui::render_activity(&session.state().gamification)),
            ChatInput::Show => print!("{}", ui::render_state(session.state())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn send_joins_words_and_globals_work_after_subcommand() {
        let cli = parse(&["aura", "send", "собери", "план", "--user", "77"]);
        assert_eq!(
            cli.command,
            Command::Send {
                text: vec!["собери".to_string(), "план".to_string()]
            }
        );
        assert_eq!(cli.user.as_deref(), Some("77"));
        assert_eq!(cli.config, PathBuf::from("aura.toml"));
    }

    #[test]
    fn reply_accepts_russian_labels() {
        let cli = parse(&["aura", "reply", "Техника"]);
        assert_eq!(
            cli.command,
            Command::Reply {
                choice: QuickReply::Technique
            }
        );
    }

    #[test]
    fn unknown_reply_and_missing_text_are_rejected() {
        assert!(Cli::try_parse_from(["aura", "reply", "dance"]).is_err());
        assert!(Cli::try_parse_from(["aura", "send"]).is_err());
        assert!(Cli::try_parse_from(["aura", "complete", "x"]).is_err());
    }

    #[test]
    fn pay_with_start_param() {
        let cli = parse(&["aura", "--start-param", "pay_plus", "pay"]);
        assert_eq!(cli.command, Command::Pay);
        assert_eq!(cli.start_param.as_deref(), Some("pay_plus"));
    }

    #[test]
    fn chat_input_commands() {
        assert_eq!(parse_chat_input("  "), ChatInput::Empty);
        assert_eq!(
            parse_chat_input(" как дела? "),
            ChatInput::Message("как дела?".to_string())
        );
        assert_eq!(parse_chat_input("/done 3"), ChatInput::Complete(3));
        assert_eq!(parse_chat_input("/reply plan"), ChatInput::Reply(QuickReply::Plan));
        assert_eq!(parse_chat_input("/plan"), ChatInput::TogglePlan);
        assert_eq!(parse_chat_input("/exit"), ChatInput::Quit);
        assert!(matches!(parse_chat_input("/done x"), ChatInput::Invalid(_)));
        assert!(matches!(parse_chat_input("/dance"), ChatInput::Invalid(_)));
    }
}
