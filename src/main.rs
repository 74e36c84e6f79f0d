use clap::{Arg, Command};
use heroflight::logging::{self, LogConfig, LogOutput};
use heroflight::runtime::run_realtime;
use heroflight::scenario::ScenarioConfig;
use heroflight::simulation::{run_headless, SessionStats};
use tracing::warn;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("heroflight")
        .version("0.1.0")
        .about("ヒーロー要素の飛行シミュレーション (Hero Flight)")
        .long_about("ヒーローバナー上を飛び回る装飾要素の運動制御を実行します。\n\
                     シナリオのホストイベント（クリック、リサイズ、タブ切り替え）を\n\
                     仮想時刻または実時間で再生します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .conflicts_with("default")
        )
        .arg(
            Arg::new("default")
                .long("default")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みのデフォルトシナリオで実行")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("realtime")
                .short('r')
                .long("realtime")
                .action(clap::ArgAction::SetTrue)
                .help("実時間で実行（指定しない場合はシナリオの設定に従う）")
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("SECS")
                .value_parser(clap::value_parser!(f64))
                .help("セッション長を上書き（秒）")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("乱数シードを上書き")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)。省略時は-vから決定")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 進行状況, -vv: 詳細, -vvv: フレーム単位)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    // ログ初期化
    let output = match matches
        .get_one::<String>("log-output")
        .map(|s| s.parse::<LogOutput>())
        .unwrap_or(Ok(LogOutput::Console))
    {
        Ok(output) => output,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(2);
        }
    };
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => logging::parse_log_level(level),
        None => logging::level_for_verbosity(verbose_level),
    };
    let _log_guard = match logging::init_logging(LogConfig { level, output, ..LogConfig::default() }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            None
        }
    };

    println!("ヒーロー要素の飛行シミュレーション - heroflight v0.1.0");
    println!();

    let scenario = if matches.get_flag("default") {
        ScenarioConfig::default()
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        match ScenarioConfig::from_file(scenario_path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        show_default_help();
        return;
    };

    let overrides = Overrides {
        duration: matches.get_one::<f64>("duration").copied(),
        seed: matches.get_one::<u64>("seed").copied(),
        realtime: matches.get_flag("realtime"),
    };

    match run_scenario(scenario, overrides, matches.get_flag("info"), verbose_level) {
        Ok(_) => {
            if verbose_level > 0 {
                println!("セッションが正常に完了しました。");
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// コマンドラインからのシナリオ上書き
struct Overrides {
    duration: Option<f64>,
    seed: Option<u64>,
    realtime: bool,
}

/// シナリオを実行
fn run_scenario(
    mut scenario: ScenarioConfig,
    overrides: Overrides,
    info_only: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(duration) = overrides.duration {
        scenario.sim.duration_s = duration;
    }
    if let Some(seed) = overrides.seed {
        scenario.sim.seed = seed;
    }
    if overrides.realtime {
        scenario.sim.realtime = true;
    }
    scenario.validate()?;

    scenario.print_summary();
    println!();

    if info_only {
        return Ok(());
    }

    let stats: Option<SessionStats> = if scenario.sim.realtime {
        run_realtime(&scenario, verbose_level)?
    } else {
        run_headless(&scenario, verbose_level)
    };

    match stats {
        Some(stats) => stats.print_summary(),
        None => warn!("SESSION_NOT_INSTALLED: ステージが不完全なためセッションを開始しませんでした"),
    }

    Ok(())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  heroflight [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    println!("      --default           組み込みのデフォルトシナリオで実行");
    println!("  -i, --info              シナリオ情報のみ表示");
    println!("  -r, --realtime          実時間で実行");
    println!("  -d, --duration <SECS>   セッション長を上書き");
    println!("      --seed <N>          乱数シードを上書き");
    println!("      --log-output <T>    ログ出力先 (console, file, both)");
    println!("  -v, --verbose           詳細出力 (複数指定で詳細レベル上昇)");
    println!("  -h, --help              このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/hero_default.yaml   - 自動起動のみ");
    println!("  scenarios/early_click.yaml    - 1.2秒でクリック起動");
    println!("  scenarios/resize_storm.yaml   - リサイズとタブ切り替えの連続");
    println!();
    println!("例:");
    println!("  heroflight -s scenarios/early_click.yaml");
    println!("  heroflight -s scenarios/resize_storm.yaml -vv");
    println!("  heroflight --default -r -d 10");
}
