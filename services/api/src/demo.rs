use clap::Args;
use orionverse::error::AppError;
use orionverse::workflows::collaboration::{
    Caller, Decision, MemoryStore, PostDraft, PostType, ProjectStatus, ProjectView,
    WorkflowEngine, WorkflowError,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the final project and notification payloads as JSON
    #[arg(long)]
    pub(crate) show_payloads: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::default());
    let engine = WorkflowEngine::new(store);

    let author = Caller::new("demo-author", "Alice");
    let developer = Caller::new("demo-dev", "Bob");
    let rival = Caller::new("demo-rival", "Carol");

    println!("Collaboration workflow demo");

    let post = engine.publish_post(
        &author,
        PostDraft {
            title: "Migrate the build to incremental caching".to_string(),
            description: "CI takes 40 minutes; it should take 8.".to_string(),
            post_type: PostType::Problem,
            tags: vec!["ci".to_string(), "build".to_string()],
        },
    )?;
    println!(
        "- {author} published \"{title}\" ({id})",
        author = post.author_name,
        title = post.title,
        id = post.id.0
    );

    let application = engine.apply(&developer, &post.id, "I sped up two builds like this before.")?;
    println!(
        "- {dev} applied -> application {id} is {status}",
        dev = application.developer_name,
        id = application.id.0,
        status = application.status.label()
    );

    match engine.apply(&developer, &post.id, "Asking twice for good measure") {
        Err(WorkflowError::DuplicateApplication) => {
            println!("- A second application from {} was refused: already applied", developer.name)
        }
        other => println!("- Unexpected duplicate outcome: {other:?}"),
    }

    let rival_application = engine.apply(&rival, &post.id, "I can also take a look.")?;
    let counted = engine.post(&post.id)?;
    println!(
        "- {} applications on the post after {} joined",
        counted.applications_count, rival.name
    );

    engine.decide(&author, &application.id, Decision::Accept)?;
    engine.decide(&author, &rival_application.id, Decision::Reject)?;
    println!("- {} accepted {} and declined {}", author.name, developer.name, rival.name);

    let Some(mut project) = engine.projects_for(&developer.id)?.into_iter().next() else {
        println!("- No project was created; nothing left to walk through");
        return Ok(());
    };
    println!(
        "- Tracked project {id} created ({status})",
        id = project.id.0,
        status = project.status.label()
    );

    project = engine.advance_project(&developer, &project.id, ProjectStatus::InProgress)?;
    project = engine.advance_project(&author, &project.id, ProjectStatus::Completed)?;
    println!(
        "- Project moved to {status} (completed at {stamp})",
        status = project.status.label(),
        stamp = project
            .completed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    );

    for caller in [&author, &developer, &rival] {
        let unread = engine.unread_notifications(&caller.id)?;
        let inbox = engine.notifications_for(&caller.id)?;
        println!("- {name}: {unread} unread notification(s)", name = caller.name);
        for notification in &inbox {
            println!(
                "    [{kind}] {title}: {message}",
                kind = notification.kind.label(),
                title = notification.title,
                message = notification.message
            );
        }
    }

    if args.show_payloads {
        let view = ProjectView::from(project);
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("Project payload:\n{json}"),
            Err(err) => println!("Project payload unavailable: {err}"),
        }
    }

    Ok(())
}
