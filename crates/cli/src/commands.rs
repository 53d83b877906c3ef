//! Subcommand handlers.

use crate::input::{default_store_dir, load_images, read_slides_file, to_indices};
use crate::{Args, Command};
use anyhow::{bail, Context, Result};
use medislide_core::ai::ClinicalAnswer;
use medislide_core::html::render_slides;
use medislide_core::{
    export_file_name, AiConfig, Case, CaseKind, CaseStore, ContentService, Deck,
    DocumentExporter, EditingSession, ExportFormat, InputMode, JsonFileStore, SessionContext,
    Slide, SlideState,
};
use medislide_docx::DocxExporter;
use medislide_gemini::GeminiClient;
use medislide_pdf::PdfExporter;
use medislide_pptx::{PptxExporter, SlideTextReader};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub async fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Validate { input, output } => validate(input, output.as_deref()),
        Command::Render { source, output } => {
            let (slides, _) = load_source(args, source)?;
            write_or_print(output.as_deref(), &render_slides(&slides))
        }
        Command::Export {
            source,
            format,
            output,
            topic,
        } => {
            let (slides, headline) = load_source(args, source)?;
            let topic = topic.clone().unwrap_or(headline);
            export(&slides, (*format).into(), &topic, output.clone())
        }
        Command::Inspect { input } => inspect(input),
        Command::Outline { topic, case } => outline(args, topic.as_deref(), *case).await,
        Command::Generate { case, picks } => generate(args, *case, picks).await,
        Command::Add { case, topics } => {
            let (mut store, mut case) = load_case(args, *case)?;
            let mut session = session_for(args, &case)?;
            let outcome = session.add_by_topics(topics).await;
            println!("Generated {} slide(s)", outcome.generated.len());
            for (id, reason) in &outcome.failed {
                println!("Slide {} failed: {}", id, reason);
            }
            save_session(&mut store, &mut case, &session)
        }
        Command::Modify {
            case,
            action,
            slides,
        } => {
            let (mut store, mut case) = load_case(args, *case)?;
            let mut session = session_for(args, &case)?;
            let indices = to_indices(slides, session.deck().len())?;
            session
                .modify((*action).into(), &indices)
                .await
                .context("Modification failed; the deck was left unchanged")?;
            println!("Deck now has {} slide(s)", session.deck().len());
            save_session(&mut store, &mut case, &session)
        }
        Command::Suggest { case } => {
            let (mut store, mut case) = load_case(args, *case)?;
            let mut session = session_for(args, &case)?;
            let added = session.suggest_topics().await?;
            log::debug!("{} new suggestion(s)", added);
            for topic in session.deck().topics().suggested() {
                println!("{}", topic);
            }
            save_session(&mut store, &mut case, &session)
        }
        Command::Remove { case, slides } => {
            let (mut store, mut case) = load_case(args, *case)?;
            let mut deck = case.deck();
            let indices: BTreeSet<usize> = to_indices(slides, deck.len())?.into_iter().collect();
            let removed = deck.remove_selected(&indices)?;
            for slide in &removed {
                println!("Removed: {}", slide.title);
            }
            case.save_deck(&deck);
            store.put(&case)?;
            Ok(())
        }
        Command::Move { case, from, to } => {
            let (mut store, mut case) = load_case(args, *case)?;
            let mut deck = case.deck();
            let positions = to_indices(&[*from, *to], deck.len())?;
            deck.reorder(positions[0], positions[1])?;
            case.save_deck(&deck);
            store.put(&case)?;
            print_deck(&deck);
            Ok(())
        }
        Command::Show { case, json } => {
            let (_, case) = load_case(args, *case)?;
            let deck = case.deck();
            if *json {
                println!("{}", deck.raw_json()?);
            } else {
                print_case(&case, &deck);
            }
            Ok(())
        }
        Command::Cases { delete } => cases(args, *delete),
        Command::Ask { question, image } => ask(args, question.as_deref(), image).await,
        Command::Diagnose { notes, image } => diagnose(args, notes.as_deref(), image).await,
    }
}

fn validate(input: &Path, output: Option<&Path>) -> Result<()> {
    let validated = read_slides_file(input)?;
    let report = &validated.report;

    if report.is_clean() {
        eprintln!("{} slide(s), no repairs needed", validated.slides.len());
    } else {
        eprintln!(
            "{} slide(s), {} table row(s) repaired",
            validated.slides.len(),
            report.repaired_rows
        );
        for rejected in &report.rejected_items {
            eprintln!(
                "  slide {} item {} dropped: {}",
                rejected.slide + 1,
                rejected.item + 1,
                rejected.reason
            );
        }
    }

    let json = Deck::from_slides(validated.slides).raw_json()?;
    write_or_print(output, &json)
}

fn export(
    slides: &[Slide],
    format: ExportFormat,
    topic: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let exporter = exporter_for(format, topic);
    let bytes = exporter
        .export(slides)
        .with_context(|| format!("Failed to export {}", format))?;

    let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(topic, format)));
    fs::write(&path, bytes).with_context(|| format!("Failed to write: {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn exporter_for(format: ExportFormat, title: &str) -> Box<dyn DocumentExporter> {
    match format {
        ExportFormat::Pdf => Box::new(PdfExporter::new().with_title(title)),
        ExportFormat::Docx => Box::new(DocxExporter::new().with_title(title)),
        ExportFormat::Pptx => Box::new(PptxExporter::new().with_title(title)),
    }
}

fn inspect(input: &Path) -> Result<()> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open file: {}", input.display()))?;
    let slides = SlideTextReader::new()
        .read(BufReader::new(file))
        .with_context(|| format!("Failed to read presentation: {}", input.display()))?;

    for slide in &slides {
        println!("--- Slide {} ---", slide.number);
        for line in slide.lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn outline(args: &Args, topic: Option<&str>, case_id: Option<Uuid>) -> Result<()> {
    let mut store = open_store(args)?;
    let mut case = match (case_id, topic) {
        (Some(id), _) => get_case(&store, id)?,
        (None, Some(topic)) => Case::new(topic, CaseKind::ContentGenerator).with_topic(topic),
        (None, None) => bail!("Either a topic or --case is required"),
    };

    let mut session = session_for(args, &case)?;
    session.build_outline().await?;
    for (i, title) in session.outline().iter().enumerate() {
        println!("{:>2}. {}", i + 1, title);
    }
    save_session(&mut store, &mut case, &session)?;
    println!("Case {}", case.id);
    Ok(())
}

async fn generate(args: &Args, id: Uuid, picks: &[usize]) -> Result<()> {
    let (mut store, mut case) = load_case(args, id)?;
    if case.outline.is_empty() {
        bail!("Case {} has no outline; run `medislide outline --case {}` first", id, id);
    }

    let selected: Vec<String> = if picks.is_empty() {
        case.outline.clone()
    } else {
        to_indices(picks, case.outline.len())?
            .into_iter()
            .map(|i| case.outline[i].clone())
            .collect()
    };

    let mut session = session_for(args, &case)?;
    let count = session.generate_deck(&selected).await?;
    println!("Appended {} slide(s)", count);
    print_deck(session.deck());
    save_session(&mut store, &mut case, &session)
}

async fn ask(args: &Args, question: Option<&str>, images: &[PathBuf]) -> Result<()> {
    if question.is_none() && images.is_empty() {
        bail!("Provide a question, an image, or both");
    }
    let images = load_images(images)?;
    let service = content_service()?;
    let config = ai_config(args)?;

    let answer = service
        .answer_clinical_question(&config, question, &images)
        .await?;
    let title = service
        .summarize_question(&config, question, &images)
        .await
        .unwrap_or_else(|e| {
            log::warn!("Could not summarize question: {}", e);
            answer.topic.clone()
        });

    print_answer(&answer);

    let mut store = open_store(args)?;
    let mut case = Case::new(title.clone(), CaseKind::ContentGenerator)
        .with_question(question.unwrap_or(title.as_str()));
    case.answer = Some(answer);
    store.put(&case)?;
    println!("\nCase {}", case.id);
    Ok(())
}

async fn diagnose(args: &Args, notes: Option<&str>, images: &[PathBuf]) -> Result<()> {
    if notes.is_none() && images.is_empty() {
        bail!("Provide patient notes, an image, or both");
    }
    let images = load_images(images)?;
    let service = content_service()?;
    let config = ai_config(args)?;

    let diagnoses = service.generate_diagnosis(&config, notes, &images).await?;
    for (i, diagnosis) in diagnoses.iter().enumerate() {
        println!(
            "{}. {} ({:.0}%)",
            i + 1,
            diagnosis.diagnosis,
            diagnosis.confidence_level * 100.0
        );
        println!("   {}", diagnosis.reasoning);
        let missing = &diagnosis.missing_information;
        if !missing.information.is_empty() {
            println!("   Missing: {}", missing.information.join(", "));
        }
        if !missing.tests.is_empty() {
            println!("   Tests: {}", missing.tests.join(", "));
        }
    }

    let mut store = open_store(args)?;
    let title = diagnoses
        .first()
        .map(|d| d.diagnosis.clone())
        .unwrap_or_else(|| "Diagnosis".to_string());
    let mut case = Case::new(title, CaseKind::Diagnosis);
    case.question = notes.map(str::to_string);
    case.diagnoses = diagnoses;
    store.put(&case)?;
    println!("\nCase {}", case.id);
    Ok(())
}

fn cases(args: &Args, delete: Option<Uuid>) -> Result<()> {
    let mut store = open_store(args)?;
    if let Some(id) = delete {
        if !store.delete(id)? {
            bail!("No case with id {}", id);
        }
        println!("Deleted {}", id);
        return Ok(());
    }

    for case in store.list()? {
        let kind = match case.kind {
            CaseKind::Diagnosis => "diagnosis",
            CaseKind::ContentGenerator => "slides",
        };
        println!(
            "{}  {}  {:<9}  {:>3} slide(s)  {}",
            case.id,
            case.created_at.format("%Y-%m-%d %H:%M"),
            kind,
            case.slides.len(),
            case.headline()
        );
    }
    Ok(())
}

/// Slides from a case id or a slide JSON file, with a headline for naming.
fn load_source(args: &Args, source: &str) -> Result<(Vec<Slide>, String)> {
    if let Ok(id) = Uuid::parse_str(source) {
        let (_, case) = load_case(args, id)?;
        let headline = case.headline().to_string();
        return Ok((case.slides, headline));
    }

    let path = Path::new(source);
    let validated = read_slides_file(path)?;
    let headline = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    Ok((validated.slides, headline))
}

fn open_store(args: &Args) -> Result<JsonFileStore> {
    let dir = args
        .store
        .clone()
        .or_else(default_store_dir)
        .context("No data directory available; pass --store")?;
    JsonFileStore::open(&dir).with_context(|| format!("Failed to open store: {}", dir.display()))
}

fn get_case(store: &JsonFileStore, id: Uuid) -> Result<Case> {
    store.get(id)?.with_context(|| format!("No case with id {}", id))
}

fn load_case(args: &Args, id: Uuid) -> Result<(JsonFileStore, Case)> {
    let store = open_store(args)?;
    let case = get_case(&store, id)?;
    Ok((store, case))
}

fn ai_config(args: &Args) -> Result<AiConfig> {
    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .context("No API key; set GEMINI_API_KEY or pass --api-key")?;
    Ok(AiConfig::new(api_key)
        .with_model(args.model.as_str())
        .with_endpoint(args.endpoint.as_str()))
}

fn content_service() -> Result<ContentService> {
    let client = GeminiClient::new()?;
    Ok(ContentService::new(Arc::new(client)))
}

fn context_for(case: &Case) -> SessionContext {
    match (case.mode, &case.question, &case.answer) {
        (InputMode::Question, Some(question), Some(answer)) => {
            SessionContext::for_case(question, &answer.answer, &answer.reasoning)
        }
        _ => SessionContext::for_topic(case.headline()),
    }
}

fn session_for(args: &Args, case: &Case) -> Result<EditingSession> {
    let session = EditingSession::new(content_service()?, ai_config(args)?, context_for(case))
        .with_deck(case.deck())
        .with_outline(case.outline.clone());
    Ok(session)
}

fn save_session(
    store: &mut JsonFileStore,
    case: &mut Case,
    session: &EditingSession,
) -> Result<()> {
    case.save_deck(session.deck());
    case.outline = session.outline().to_vec();
    store
        .put(case)
        .with_context(|| format!("Failed to save case {}", case.id))
}

fn write_or_print(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write: {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn print_answer(answer: &ClinicalAnswer) {
    println!("Topic: {}\n", answer.topic);
    println!("{}\n", answer.answer);
    println!("Reasoning: {}", answer.reasoning);
}

fn print_deck(deck: &Deck) {
    for (i, entry) in deck.entries().iter().enumerate() {
        let marker = match entry.state() {
            SlideState::Populated => String::new(),
            SlideState::Placeholder => " (pending)".to_string(),
            SlideState::Failed(reason) => format!(" (failed: {})", reason),
        };
        println!(
            "{:>2}. {} [{} item(s)]{}",
            i + 1,
            entry.slide().title,
            entry.slide().content.len(),
            marker
        );
    }
}

fn print_case(case: &Case, deck: &Deck) {
    println!("{}", case.headline());
    println!("Created {}\n", case.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(answer) = &case.answer {
        print_answer(answer);
        println!();
    }
    if !case.outline.is_empty() {
        println!("Outline:");
        for (i, title) in case.outline.iter().enumerate() {
            println!("{:>2}. {}", i + 1, title);
        }
        println!();
    }
    if deck.is_empty() {
        println!("No slides yet");
    } else {
        print_deck(deck);
    }
    let suggested: Vec<&str> = deck.topics().suggested().collect();
    if !suggested.is_empty() {
        println!("\nSuggested topics: {}", suggested.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_for_topic_case() {
        let case = Case::new("Sepsis", CaseKind::ContentGenerator).with_topic("Sepsis");
        assert_eq!(context_for(&case), SessionContext::for_topic("Sepsis"));
    }

    #[test]
    fn test_context_for_answered_question() {
        let mut case = Case::new("Chest pain", CaseKind::ContentGenerator)
            .with_question("55M with chest pain?");
        case.answer = Some(ClinicalAnswer {
            answer: "Acute coronary syndrome".to_string(),
            reasoning: "ST elevation".to_string(),
            topic: "ACS".to_string(),
        });

        let context = context_for(&case);
        assert_eq!(context.question.as_deref(), Some("55M with chest pain?"));
        assert_eq!(context.answer.as_deref(), Some("Acute coronary syndrome"));
        assert_eq!(context.topic, None);
    }

    #[test]
    fn test_unanswered_question_falls_back_to_topic() {
        let case = Case::new("Chest pain", CaseKind::ContentGenerator).with_question("Why?");
        assert_eq!(context_for(&case).topic.as_deref(), Some("Why?"));
    }

    #[test]
    fn test_exporter_for_each_format() {
        for format in ExportFormat::ALL {
            assert_eq!(exporter_for(format, "Asthma").format(), format);
        }
    }
}
