use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chatrelay_core_sdk::{
    config::ConfigStore,
    llm,
    models::{Config, RelayInput},
    relay, server, telemetry,
};

/**
 * \brief CLI 程序入口：配置管理、单轮聊天与本地服务。
 */
#[derive(Parser, Debug)]
#[command(name = "chatrelay", version, about = "Minimal LLM chat relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 初始化或更新配置；仅覆盖提供的字段。
     * \param api_key  API 密钥
     * \param username 用户显示名称
     * \param model    模型名
     */
    Init {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },

    /**
     * \brief 发送一条用户消息并打印模型回复。
     */
    Chat {
        #[arg(long)]
        prompt: String,
    },

    /**
     * \brief 列出远端可用模型。
     */
    Models,

    /**
     * \brief 清除已保存的配置。
     */
    Clear,

    /**
     * \brief 启动本地 HTTP 服务。
     */
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_from_env();

    let store = ConfigStore::open_default();

    match cli.command {
        Commands::Init {
            api_key,
            username,
            model,
        } => {
            let merged = store
                .save(Config {
                    api_key,
                    username,
                    model,
                })
                .context("save configuration failed")?;
            println!(
                "Saved configuration (api_key={} | username={} | model={})",
                if merged.api_key.is_some() { "set" } else { "unset" },
                merged.username.as_deref().unwrap_or("unset"),
                merged.model.as_deref().unwrap_or("unset")
            );
        }
        Commands::Chat { prompt } => {
            telemetry::log_event("cli.chat", &format!("prompt_len={}", prompt.len()));
            let reply = relay::relay(&store, &RelayInput::Single(prompt), None)
                .await
                .context("relay failed, run: chatrelay init --api-key ... --username ... --model ...")?;
            println!("{}", reply);
        }
        Commands::Models => {
            let config = store.load();
            let api_key = config
                .api_key
                .context("no api key configured, run: chatrelay init --api-key ...")?;
            let models = llm::list_models(llm::API_BASE, &api_key)
                .await
                .context("list models failed")?;
            for model in models {
                println!("{}", model);
            }
        }
        Commands::Clear => {
            store.clear().context("clear configuration failed")?;
            println!("Configuration cleared");
        }
        Commands::Serve { addr } => {
            server::run(&addr).await?;
        }
    }

    Ok(())
}
