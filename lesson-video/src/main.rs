//! lesson-video - Turn a learning prompt into a narrated, time-budgeted slide video

mod assemble;
mod config;
mod error;
mod lesson;
mod media;
mod memory;
mod pipeline;
mod session;
mod slide;
mod stt;
mod text;
mod tts;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use config::LessonConfig;
use indicatif::{ProgressBar, ProgressStyle};
use lesson::{LessonPlanner, TopicLesson};
use llm_client::LlmProvider;
use media::{Ffmpeg, VideoMuxer};
use memory::ContextMemory;
use serde_json::{Value, json};
use session::{ResponseRecord, SessionLayout};
use slide::FontSlideRenderer;
use std::path::PathBuf;
use stt::{CommandStt, SpeechToText};
use tts::{CommandTts, TtsNarrator};

#[derive(Parser, Debug)]
#[command(name = "lesson-video")]
#[command(about = "Turn a learning prompt into a narrated, time-budgeted slide video", long_about = None)]
#[command(version)]
struct Args {
    /// What you want to learn about
    prompt: Option<String>,

    /// Spoken prompt to transcribe instead of a text prompt
    #[arg(long, conflicts_with = "prompt")]
    audio: Option<PathBuf>,

    /// Narration script to render as-is (skips lesson authoring)
    #[arg(long)]
    narration: Option<PathBuf>,

    /// Requested lesson length in minutes (default from config)
    #[arg(short, long)]
    minutes: Option<f32>,

    /// Hard cap on video length in seconds (default: minutes * 60)
    #[arg(long)]
    max_seconds: Option<f64>,

    /// Do not cap the video length
    #[arg(long, conflicts_with = "max_seconds")]
    unbounded: bool,

    /// Extra audience/context info for the narration
    #[arg(long)]
    context: Option<String>,

    /// Follow-up question to answer once the lesson is written
    #[arg(short, long)]
    question: Option<String>,

    /// LLM preset from llm.toml
    #[arg(long)]
    model: Option<String>,

    /// Output root directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the slide font
    SetFont {
        /// Path to a TrueType/OpenType font
        path: PathBuf,
    },
    /// Set the output root directory
    SetOutput {
        /// Directory for frames/, audio/, video/ and response/
        path: PathBuf,
    },
    /// Set the default lesson length
    SetMinutes {
        /// Minutes (greater than 0)
        value: f32,
    },
    /// Set the TTS command, e.g. `piper --model en.onnx --output_file {output} {text}`
    SetTts {
        /// Extension of the audio the command writes
        #[arg(long, default_value = "wav")]
        extension: String,
        /// Command and arguments with {text} and {output} placeholders
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

/// Lesson text produced by the authoring stages.
struct AuthoredLesson {
    narration: String,
    sections: Vec<(String, String)>,
    /// Lesson the follow-up question is answered against
    focus: Option<TopicLesson>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let config = LessonConfig::load().context("Failed to load configuration")?;
    run(&args, &config).await
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run(args: &Args, config: &LessonConfig) -> Result<()> {
    let minutes = args.minutes.unwrap_or(config.default_minutes);
    if minutes.is_nan() || minutes <= 0.0 {
        anyhow::bail!("Lesson length must be greater than 0 minutes");
    }

    let max_total_duration = if args.unbounded {
        None
    } else {
        Some(args.max_seconds.unwrap_or(minutes as f64 * 60.0))
    };
    if let Some(max) = max_total_duration {
        if !(max > 0.0 && max.is_finite()) {
            anyhow::bail!("--max-seconds must be a positive number");
        }
    }

    let ffmpeg = Ffmpeg::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone());
    if !ffmpeg.is_available() {
        anyhow::bail!(
            "ffmpeg/ffprobe not found. Install ffmpeg or set ffmpeg_path/ffprobe_path in {}",
            LessonConfig::config_path()?.display()
        );
    }

    let prompt = resolve_prompt(args, config)?;
    let session = session::session_name(&prompt, Local::now());
    let output_root = args.output.clone().unwrap_or_else(|| config.output_root.clone());
    let layout = SessionLayout::create(&output_root, session.as_str())?;

    if args.debug {
        eprintln!("Prompt: {}", prompt);
        eprintln!("Session: {}", session);
        eprintln!("Output root: {}", output_root.display());
        eprintln!("Minutes: {}", minutes);
        eprintln!("Max duration: {:?}", max_total_duration);
    }

    let mut memory = ContextMemory::new(session.as_str());
    memory.save("user_input", prompt.as_str());

    let provider = if args.narration.is_none() || args.question.is_some() {
        let preset = args.model.as_deref().or(config.llm_preset.as_deref());
        Some(lesson::connect(preset)?)
    } else {
        None
    };

    let authored = match &args.narration {
        Some(path) => {
            let narration = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read narration {}", path.display()))?;
            AuthoredLesson {
                narration,
                sections: Vec::new(),
                focus: None,
            }
        }
        None => {
            let provider = provider.as_deref().context("No LLM provider connected")?;
            author_lesson(provider, &prompt, minutes, args.context.as_deref(), &mut memory).await?
        }
    };
    memory.save("transcript", authored.narration.as_str());

    eprintln!("Generating video...");
    let renderer = FontSlideRenderer::load(config.font_path.as_deref())?;
    let tts = CommandTts::new(
        config.tts_command.clone(),
        config.tts_extension.clone(),
        ffmpeg.clone(),
    )?;
    let narrator = TtsNarrator::new(tts, ffmpeg.clone(), config.tts_retries);
    let muxer = VideoMuxer::new(ffmpeg, prompt.as_str());

    let output = pipeline::generate_video(
        &authored.narration,
        max_total_duration,
        &layout,
        narrator,
        renderer,
        &muxer,
        sentence_progress(),
    )?;

    ResponseRecord {
        prompt: &prompt,
        session: &session,
        max_total_duration,
        sections: authored.sections,
        narration: &authored.narration,
        output: &output,
    }
    .write(&layout.response_path)?;

    if let (Some(question), Some(provider)) = (&args.question, provider.as_deref()) {
        let lesson_text = authored
            .focus
            .as_ref()
            .map_or(authored.narration.as_str(), |l| l.text.as_str());
        let context = json!({
            "topic_tiers": memory.get("topic_tiers", Value::Null),
            "simplified_steps": memory.get("simplified_steps", Value::Null),
            "clarifications": memory.get("clarifications", json!([])),
        });

        let answer = LessonPlanner::new(provider)
            .clarify(question, lesson_text, Some(&context))
            .await?;
        memory.append("clarifications", json!({"q": question, "a": answer}));
        session::append_clarification(&layout.response_path, question, &answer)?;
        eprintln!("\n--- Clarification ---\n{}\n", answer);
    }

    eprintln!(
        "\nDone! {:.1}s across {} chapter(s)",
        output.total_duration(),
        output.chapters.len()
    );
    println!("{}", output.main_video.display());
    println!("{}", layout.response_path.display());

    Ok(())
}

/// The text prompt, a transcription of the audio prompt, or the narration
/// file's name.
fn resolve_prompt(args: &Args, config: &LessonConfig) -> Result<String> {
    if let Some(prompt) = &args.prompt {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            anyhow::bail!("Prompt is empty");
        }
        return Ok(prompt.to_string());
    }

    if let Some(audio) = &args.audio {
        eprintln!("Transcribing {}...", audio.display());
        let stt = CommandStt::new(config.stt_command.clone())?;
        let prompt = stt.transcribe(audio)?;
        eprintln!("Heard: {}", prompt);
        return Ok(prompt);
    }

    if let Some(path) = &args.narration {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        return Ok(stem.into_owned());
    }

    anyhow::bail!("A prompt, --audio or --narration is required. Run 'lesson-video --help' for usage.")
}

async fn author_lesson(
    provider: &dyn LlmProvider,
    prompt: &str,
    minutes: f32,
    extra_context: Option<&str>,
    memory: &mut ContextMemory,
) -> Result<AuthoredLesson> {
    let planner = LessonPlanner::new(provider);

    eprintln!("Discovering topics...");
    let tiers = planner.discover(prompt).await?;
    memory.save("topic_tiers", serde_json::to_value(&tiers)?);
    if tiers.is_empty() {
        anyhow::bail!("Could not work out any topics for this prompt");
    }

    eprintln!("Breaking topics into steps...");
    let steps = planner.simplify(&tiers).await?;
    memory.save("simplified_steps", serde_json::to_value(&steps)?);
    if steps.is_empty() {
        anyhow::bail!("Could not break the topics into teachable steps");
    }

    eprintln!("Writing {} lesson(s)...", steps.len());
    let lessons = planner.teach(&steps).await?;
    memory.save("lessons", serde_json::to_value(&lessons)?);

    let engaged = planner.engage(&lessons).await?;
    memory.save("engaged_lessons", serde_json::to_value(&engaged)?);

    eprintln!("Writing a {}-minute narration...", minutes);
    let narration = planner
        .write_narration(&engaged, minutes, extra_context)
        .await?;

    let sections = vec![
        ("Topic tiers".to_string(), serde_json::to_string_pretty(&tiers)?),
        ("Lessons".to_string(), render_lessons(&engaged)),
    ];

    Ok(AuthoredLesson {
        narration,
        sections,
        focus: engaged.into_iter().next(),
    })
}

fn render_lessons(lessons: &[TopicLesson]) -> String {
    lessons
        .iter()
        .map(|l| format!("--- {} ---\n{}", l.topic, l.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn sentence_progress() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} sentences ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = LessonConfig::load()?;
            println!("Configuration file: {:?}", LessonConfig::config_path()?);
            println!();
            println!("output_root = \"{}\"", config.output_root.display());
            match &config.font_path {
                Some(font) => println!("font_path = \"{}\"", font.display()),
                None => println!("font_path = (system font)"),
            }
            println!("tts_command = {:?}", config.tts_command);
            println!("tts_extension = \"{}\"", config.tts_extension);
            println!("tts_retries = {}", config.tts_retries);
            println!("stt_command = {:?}", config.stt_command);
            match &config.ffmpeg_path {
                Some(path) => println!("ffmpeg_path = \"{}\"", path.display()),
                None => println!("ffmpeg_path = (PATH)"),
            }
            match &config.ffprobe_path {
                Some(path) => println!("ffprobe_path = \"{}\"", path.display()),
                None => println!("ffprobe_path = (PATH)"),
            }
            println!("default_minutes = {}", config.default_minutes);
            match &config.llm_preset {
                Some(preset) => println!("llm_preset = \"{}\"", preset),
                None => println!("llm_preset = (llm.toml default)"),
            }
        }
        ConfigAction::SetFont { path } => {
            if !path.is_file() {
                anyhow::bail!("Font not found: {}", path.display());
            }
            let mut config = LessonConfig::load()?;
            config.font_path = Some(path.clone());
            config.save()?;
            println!("Slide font set to: {}", path.display());
        }
        ConfigAction::SetOutput { path } => {
            let mut config = LessonConfig::load()?;
            config.output_root = path.clone();
            config.save()?;
            println!("Output root set to: {}", path.display());
        }
        ConfigAction::SetMinutes { value } => {
            if value.is_nan() || *value <= 0.0 {
                anyhow::bail!("Minutes must be greater than 0");
            }
            let mut config = LessonConfig::load()?;
            config.default_minutes = *value;
            config.save()?;
            println!("Default lesson length set to: {} minutes", value);
        }
        ConfigAction::SetTts { extension, command } => {
            CommandTts::new(command.clone(), extension.as_str(), Ffmpeg::default())?;
            let mut config = LessonConfig::load()?;
            config.tts_command = command.clone();
            config.tts_extension = extension.clone();
            config.save()?;
            println!("TTS command set to: {}", command.join(" "));
        }
    }
    Ok(())
}
