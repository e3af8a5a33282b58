use std::{process, sync::Arc};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use piazza::{
    application::{
        answers::{
            AnswerCommitter, AnswerConfig, AnswerGenerator, CommitConfig, CommitOutcome,
            InFlightAnswers,
        },
        error::{AppError, ErrorReport},
        items::{ItemView, ItemViewService},
        jobs::{AnswerJobContext, process_answer_batch_job, run_answer_batch},
        render::{RenderService, render_service},
    },
    cache::{CacheConfig, ViewStore},
    config::{self, Command, RenderArgs, Settings},
    domain::{category::CategoryClassifier, entities::BotIdentity},
    infra::{
        completion::HttpCompletionService, error::InfraError, store::SnapshotStore, telemetry,
    },
};
use tokio::io::AsyncReadExt;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("main", error);
    if dispatcher::has_been_set() {
        error!(source = report.source, error = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, error = %report.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command.unwrap_or(Command::Work) {
        Command::Render(args) => run_render(args).await,
        Command::Answer(args) => run_answer(&settings, args.item_id).await,
        Command::Batch(_) => run_batch(&settings).await,
        Command::Show(args) => run_show(&settings, args.item_id).await,
        Command::Work => run_work(settings).await,
    }
}

/// Collaborators shared by every command that touches stored content.
struct Runtime {
    store: Arc<SnapshotStore>,
    items: ItemViewService,
    job_context: AnswerJobContext,
}

async fn build_runtime(settings: &Settings) -> Result<Runtime, AppError> {
    let store = Arc::new(
        SnapshotStore::open(settings.store.path.clone())
            .await
            .map_err(AppError::from)?,
    );
    let renderer: Arc<dyn RenderService> = render_service();
    let completion = Arc::new(HttpCompletionService::new(&settings.completion)?);
    let views: Arc<ViewStore<ItemView>> =
        Arc::new(ViewStore::new(&CacheConfig::from(&settings.cache)));

    let answers = &settings.answers;
    let generator = AnswerGenerator::new(
        completion,
        store.clone(),
        renderer.clone(),
        CategoryClassifier::new(answers.keywords.iter()),
        AnswerConfig {
            primary_model: settings.completion.primary_model.clone(),
            secondary_model: settings.completion.secondary_model.clone(),
            model_timeout: settings.completion.timeout,
            max_tokens: settings.completion.max_tokens.get(),
            temperature: settings.completion.temperature,
            max_comment_length: answers.max_comment_length.get(),
            language: answers.language.clone(),
            max_source_chars: answers.max_source_chars.get(),
        },
    );

    let bot = BotIdentity::new(answers.bot_user_id, answers.bot_display_name.clone())?;
    let inflight = InFlightAnswers::new();
    let committer = Arc::new(AnswerCommitter::new(
        store.clone(),
        generator,
        views.clone(),
        inflight.clone(),
        CommitConfig {
            bot,
            batch_size: answers.batch_size.get(),
            batch_delay: answers.batch_delay,
            persistence_timeout: answers.persistence_timeout,
            cache_namespace: views.namespace().to_string(),
        },
    ));

    let items = ItemViewService::new(store.clone(), renderer, views);
    let job_context = AnswerJobContext {
        store: store.clone(),
        committer,
        inflight,
        candidate_window: answers.candidate_window.get(),
        batch_size: answers.batch_size.get(),
    };

    Ok(Runtime {
        store,
        items,
        job_context,
    })
}

async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let markdown = match args.input {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(|err| AppError::from(InfraError::Io(err)))?;
            buffer
        }
    };

    let output = render_service().render(&markdown);
    println!("{}", output.html);
    Ok(())
}

async fn run_answer(settings: &Settings, item_id: Uuid) -> Result<(), AppError> {
    let runtime = build_runtime(settings).await?;
    let outcome = runtime
        .job_context
        .committer
        .generate_and_commit_answer(item_id)
        .await;
    runtime.store.save().await?;

    match outcome {
        CommitOutcome::Committed { answer_id } => println!("committed {answer_id}"),
        CommitOutcome::ItemMissing => return Err(AppError::NotFound),
        other => println!("no answer: {other:?}"),
    }
    Ok(())
}

/// `--max` has already been folded into `answers.batch_size` while loading settings.
async fn run_batch(settings: &Settings) -> Result<(), AppError> {
    let runtime = build_runtime(settings).await?;
    let report = run_answer_batch(&runtime.job_context, runtime.job_context.batch_size).await?;

    for candidate in &report.candidates {
        println!("{} {:?}", candidate.item_id, candidate.outcome);
    }
    println!(
        "processed {} committed {}",
        report.processed(),
        report.committed()
    );
    Ok(())
}

async fn run_show(settings: &Settings, item_id: Uuid) -> Result<(), AppError> {
    let runtime = build_runtime(settings).await?;
    let view = runtime.items.render_item(item_id).await?;
    println!("{}", view.html);
    Ok(())
}

async fn run_work(settings: Settings) -> Result<(), AppError> {
    let runtime = build_runtime(&settings).await?;

    let worker = WorkerBuilder::new("answer-batch-worker")
        .concurrency(1)
        .data(runtime.job_context.clone())
        .backend(CronStream::new(settings.answers.schedule.clone()))
        .build_fn(process_answer_batch_job);

    info!(
        store = %settings.store.path.display(),
        "Answer worker started"
    );

    let result = Monitor::new()
        .register(worker)
        .run_with_signal(tokio::signal::ctrl_c())
        .await;

    runtime.store.save().await?;

    result.map_err(|err| AppError::unexpected(format!("answer worker stopped: {err}")))
}
