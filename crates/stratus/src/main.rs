mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "宣言したとおりに、クラウドは形になる。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 望ましい状態グラフを合成して JSON 文書として出力
    Synth {
        /// トポロジー (hardened, routed)
        #[arg(short = 't', long, env = "STRATUS_TOPOLOGY")]
        topology: Option<String>,
        /// 出力先ファイル（省略時は標準出力）
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// スタック定義と依存グラフを検証
    Validate {
        /// トポロジー (hardened, routed)
        #[arg(short = 't', long, env = "STRATUS_TOPOLOGY")]
        topology: Option<String>,
    },
    /// 適用済みスタックの出力値を表示
    Outputs {
        /// トポロジー (hardened, routed)
        #[arg(short = 't', long, env = "STRATUS_TOPOLOGY")]
        topology: Option<String>,
        /// JSON 形式で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("stratus {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // プロジェクトルートを検索
    let project_root = match stratus_core::find_project_root() {
        Ok(root) => root,
        Err(e @ stratus_core::StackError::ProjectRootNotFound(_)) => {
            eprintln!("{}", "✗ プロジェクトルートが見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    // コマンドディスパッチ
    match cli.command {
        Commands::Synth { topology, out } => {
            commands::synth::handle(&project_root, topology.as_deref(), out.as_deref()).await?;
        }
        Commands::Validate { topology } => {
            commands::validate::handle(&project_root, topology.as_deref()).await?;
        }
        Commands::Outputs { topology, json } => {
            commands::outputs::handle(&project_root, topology.as_deref(), json).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before project discovery");
        }
    }

    Ok(())
}
