use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use dotenv::dotenv;
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use ai_interface::client::platform::{
    Clipboard, DirDownloader, FileThemeStore, MemoryClipboard, MemoryThemeStore, Platform,
    SystemClipboard, ThemeStore,
};
use ai_interface::client::transport::HttpTransport;
use ai_interface::client::ConversationClient;
use ai_interface::model::MODELS;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Terminal chat against the AI interface prototype",
    long_about = None
)]
struct Args {
    /// Base URL of the ai-interface server
    #[arg(long, env = "AI_INTERFACE_URL", default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Model label sent with every message
    #[arg(long)]
    model: Option<String>,

    /// Temperature in [0, 1]
    #[arg(long)]
    temperature: Option<f64>,

    /// Max tokens in [50, 500]
    #[arg(long)]
    max_tokens: Option<u32>,

    /// File the theme choice is kept in between runs
    #[arg(long, env = "AI_INTERFACE_THEME_FILE")]
    theme_file: Option<PathBuf>,

    /// Directory `/download` writes response.json into
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,
}

#[derive(Debug, PartialEq)]
enum Command {
    Say(String),
    Model(String),
    Models,
    Temperature(f64),
    MaxTokens(u32),
    Template(String),
    Templates,
    Send,
    Theme,
    Copy(usize),
    Download(usize),
    History,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "model" if !arg.is_empty() => Command::Model(arg.to_string()),
            "models" => Command::Models,
            "temperature" => {
                let t: f64 = arg.parse()?;
                if !t.is_finite() {
                    return Err(anyhow!("temperature must be a finite number"));
                }
                Command::Temperature(t)
            }
            "max-tokens" => Command::MaxTokens(arg.parse()?),
            "template" if !arg.is_empty() => Command::Template(arg.to_string()),
            "templates" => Command::Templates,
            "send" => Command::Send,
            "theme" => Command::Theme,
            "copy" => Command::Copy(message_index(arg)?),
            "download" => Command::Download(message_index(arg)?),
            "history" => Command::History,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(anyhow!("unknown command: /{}", name)),
        };
        Ok(command)
    }
}

// 1-based, matching what /history prints
fn message_index(arg: &str) -> Result<usize> {
    let n: usize = arg.parse()?;
    n.checked_sub(1).ok_or_else(|| anyhow!("messages are numbered from 1"))
}

const HELP: &str = "\
Type a message and press Enter to send it.
  /model NAME        pick the model label
  /models            list model labels
  /temperature X     set temperature (0-1)
  /max-tokens N      set max tokens (50-500)
  /template ID       load a template into the input
  /templates         list templates
  /send              send the loaded input
  /theme             toggle light/dark
  /copy N            copy reply N to the clipboard
  /download N        save reply N to response.json
                     (N is an assistant reply from /history)
  /history           print the conversation
  /quit";

fn print_last_reply(client: &ConversationClient) {
    if let Some(reply) = client.messages().last() {
        println!("\n{}\n", reply.content);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let args = Args::parse();

    let theme_store: Arc<dyn ThemeStore> = match &args.theme_file {
        Some(path) => Arc::new(FileThemeStore::new(path)),
        None => Arc::new(MemoryThemeStore::default()),
    };
    let clipboard: Arc<dyn Clipboard> = match SystemClipboard::new() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(e) => {
            warn!("Copies stay inside this session: {:#}", e);
            Arc::new(MemoryClipboard::default())
        }
    };
    let platform = Platform {
        theme_store,
        clipboard,
        downloader: Arc::new(DirDownloader::new(&args.download_dir)),
    };

    let client = ConversationClient::new(Arc::new(HttpTransport::new(&args.url)), platform);
    if let Some(model) = args.model {
        client.set_model(model);
    }
    if let Some(temperature) = args.temperature {
        client.set_temperature(temperature)?;
    }
    if let Some(max_tokens) = args.max_tokens {
        client.set_max_tokens(max_tokens);
    }
    if let Err(e) = client.refresh_templates().await {
        warn!("Using built-in templates: {:#}", e);
    }

    println!("Connected to {} (theme: {}). /help for commands.", args.url, client.theme());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match command {
            Command::Say(text) => {
                if let Some(handle) = client.send_message(&text) {
                    handle.await?;
                    print_last_reply(&client);
                }
            }
            Command::Send => match client.submit_input() {
                Some(handle) => {
                    handle.await?;
                    print_last_reply(&client);
                }
                None => eprintln!("Nothing to send"),
            },
            Command::Model(model) => client.set_model(model),
            Command::Models => {
                let current = client.parameters().model;
                for model in MODELS {
                    let marker = if model == current { "*" } else { " " };
                    println!("{} {}", marker, model);
                }
            }
            Command::Temperature(t) => {
                if let Err(e) = client.set_temperature(t) {
                    eprintln!("{:#}", e);
                }
            }
            Command::MaxTokens(n) => client.set_max_tokens(n),
            Command::Template(id) => {
                if client.load_template(&id) {
                    println!("Input: {}\n(/send to send it)", client.input());
                } else {
                    eprintln!("No template named {}", id);
                }
            }
            Command::Templates => {
                for t in client.templates() {
                    println!("{:<10} {}", t.id, t.text);
                }
            }
            Command::Theme => println!("Theme: {}", client.toggle_theme()),
            Command::Copy(index) => match client.copy_message(index) {
                Ok(()) => println!("Copied to clipboard!"),
                Err(e) => eprintln!("{:#}", e),
            },
            Command::Download(index) => match client.download_message(index) {
                Ok(()) => println!("Saved response.json"),
                Err(e) => eprintln!("{:#}", e),
            },
            Command::History => {
                for (i, m) in client.messages().iter().enumerate() {
                    println!("{:>3} [{:?}] {}", i + 1, m.role, m.content);
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    Ok(())
}
