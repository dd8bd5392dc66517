// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::fs::OpenOptions;
use std::io::{Result, stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

mod characters;
mod config;
mod navigator;
mod pager;
mod progress;
mod session;
mod speech;
mod store;
mod ui;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use console::style;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use pager::ListSource;
use session::Session;
use store::FileStore;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::prelude::*;

const LOG_FILE: &str = "shengzi.log";

// --------------------------------------------------
// コマンドライン
// --------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "shengzi", version, about = "生字カード (汉字学习)")]
struct Cli {
    /// 生字データ (JSON)
    #[arg(long, env = "SHENGZI_DATA", default_value = "data.json", global = true)]
    data: PathBuf,

    /// 進度の保存先ディレクトリ
    #[arg(long, env = "SHENGZI_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// 今回だけ使う学年
    #[arg(long, global = true)]
    grade: Option<String>,

    /// 読み上げコマンド ({lang} {rate} を置換)
    #[arg(long, env = "SHENGZI_TTS", global = true)]
    tts: Option<String>,

    /// 読み上げをしない
    #[arg(long, global = true)]
    mute: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// カード学習画面を開く (既定)
    Study,
    /// データファイルの学年一覧
    Grades,
    /// 学年を選んで保存する
    Select {
        /// 省略すると一覧から選ぶ
        #[arg(value_name = "GRADE")]
        name: Option<String>,
    },
    /// 現在の学年の進度を表示する
    Stats,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            data_file: self.data.clone(),
            grade: self.grade.clone(),
            tts_command: self.tts.clone(),
            mute: self.mute,
        }
    }
}

// --------------------------------------------------
// メイン関数
// --------------------------------------------------

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => store::default_data_dir()?,
    };
    init_logging(&data_dir)?;

    let config = cli.config();
    let store = FileStore::open(&data_dir)?;
    info!(store = %store.path().display(), "shengzi v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Study) {
        Commands::Study => study(&config, store),
        Commands::Grades => print_grades(&config, &store),
        Commands::Select { name } => select_grade(&config, store, name),
        Commands::Stats => print_stats(&config, &store),
    }
}

/// 画面を占有するのでログはファイルへ出す
fn init_logging(data_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("ログファイルを開けません: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// --------------------------------------------------
// サブコマンド
// --------------------------------------------------

fn study(config: &Config, store: FileStore) -> anyhow::Result<()> {
    let mut session = Session::start(config, Box::new(store), config.speaker());

    // raw モードに入った時点から、どこで抜けても (panic を含む) 端末を戻す
    enable_raw_mode()?;
    let _guard = TerminalGuard::new(restore_terminal);
    install_panic_hook();

    let mut terminal = setup_terminal()?;
    run_app(&mut terminal, &mut session)?;
    Ok(())
}

fn print_grades(config: &Config, store: &FileStore) -> anyhow::Result<()> {
    let grades = characters::list_grades(&config.data_file)
        .with_context(|| format!("{} を読み込めません", config.data_file.display()))?;
    let selected = config::selected_grade(store);
    for grade in grades {
        if grade == selected {
            println!("{} {}", style("*").green().bold(), style(&grade).bold());
        } else {
            println!("  {grade}");
        }
    }
    Ok(())
}

fn select_grade(config: &Config, mut store: FileStore, grade: Option<String>) -> anyhow::Result<()> {
    let grade = match grade {
        Some(grade) => grade,
        None => {
            let grades = characters::list_grades(&config.data_file)
                .with_context(|| format!("{} を読み込めません", config.data_file.display()))?;
            if grades.is_empty() {
                bail!("{} に学年がありません", config.data_file.display());
            }
            let current = config::selected_grade(&store);
            let default = grades.iter().position(|g| *g == current).unwrap_or(0);
            let index = dialoguer::Select::new()
                .with_prompt("学年を選んでください")
                .items(&grades)
                .default(default)
                .interact()?;
            grades[index].clone()
        }
    };

    config::save_selected_grade(&mut store, &grade)?;
    info!(%grade, "学年を保存しました");
    println!("{} {}", style("✔").green(), style(&grade).bold());
    Ok(())
}

fn print_stats(config: &Config, store: &FileStore) -> anyhow::Result<()> {
    let grade = config.resolve_grade(store);
    let deck = characters::load_deck(&config.data_file, &grade);
    let state = progress::load(store, &grade);

    println!("{}", style(format!("{grade} 生字学习")).bold());
    println!("  总数   {}", deck.len());
    println!("  已学习 {}", style(state.learned.len()).cyan());
    println!("  需复习 {}", style(state.review.len()).yellow());
    println!("  已掌握 {}", style(state.mastered.len()).green());
    match progress::last_updated(store, &grade) {
        Some(at) => println!("  最后更新 {}", at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")),
        None => println!("  最后更新 -"),
    }
    Ok(())
}

// --------------------------------------------------
// TUIセットアップと実行ループ
// --------------------------------------------------

/// スコープを抜けるときに `restore` を呼ぶ
struct TerminalGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> TerminalGuard<F> {
    fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for TerminalGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// panic メッセージが代替スクリーンに消えないよう、先に端末を戻す
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));
}

/// raw モードは呼び出し側で有効にしておく
fn setup_terminal() -> Result<Terminal<impl Backend>> {
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// 途中の手順が失敗しても残りは必ず実行する
fn restore_terminal() {
    if let Err(err) = stdout().execute(Show) {
        warn!(error = %err, "カーソルを再表示できません");
    }
    if let Err(err) = stdout().execute(LeaveAlternateScreen) {
        warn!(error = %err, "代替スクリーンを終了できません");
    }
    if let Err(err) = disable_raw_mode() {
        warn!(error = %err, "raw モードを解除できません");
    }
}

fn run_app(terminal: &mut Terminal<impl Backend>, session: &mut Session) -> Result<()> {
    loop {
        terminal.draw(|f| ui::ui(f, session))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press && handle_key(session, key.code) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// キー入力をセッション操作に変換する。終了するなら true
fn handle_key(session: &mut Session, code: KeyCode) -> bool {
    if session.viewer_open() {
        match code {
            KeyCode::Esc => session.close_viewer(),
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => session.prev_page(),
            KeyCode::Right | KeyCode::Char('l') => session.next_page(),
            KeyCode::Char(c @ '1'..='4') => session.select_on_page(c as usize - '1' as usize),
            KeyCode::Char('v') => session.open_viewer(ListSource::Review),
            KeyCode::Char('g') => session.open_viewer(ListSource::Mastered),
            _ => {}
        }
        return false;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') => return true,
        KeyCode::Left | KeyCode::Char('h') => session.prev(),
        KeyCode::Right | KeyCode::Char('l') => session.next(),
        KeyCode::Char(' ') | KeyCode::Char('s') => session.speak_current(),
        KeyCode::Char('r') => session.mark_review(),
        KeyCode::Char('m') => session.mark_mastered(),
        KeyCode::Char('v') => session.open_viewer(ListSource::Review),
        KeyCode::Char('g') => session.open_viewer(ListSource::Mastered),
        _ => {}
    }
    false
}
