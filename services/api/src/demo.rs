use crate::infra::{in_memory_service, open_database};
use clap::Args;
use lostfound::config::AppConfig;
use lostfound::error::AppError;
use lostfound::items::{
    Item, ItemError, ItemRepository, ItemStatus, ItemSubmission, LostFoundService,
    ModeratorCredentials, SqliteItemRepository,
};
use std::thread;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Title of the demo item.
    #[arg(long, default_value = "Blue Backpack")]
    pub(crate) title: String,
    /// Number of concurrent claimants racing for the item.
    #[arg(long, default_value_t = 3)]
    pub(crate) claimants: usize,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ItemsListArgs {
    /// Only show items in this status (pending_approval, approved, rejected, claimed).
    #[arg(long)]
    pub(crate) status: Option<ItemStatus>,
}

pub(crate) fn run_items_list(args: ItemsListArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let repository = SqliteItemRepository::new(open_database(&config)?);
    let items = repository.list(args.status)?;

    let scope = args
        .status
        .map_or_else(|| "all statuses".to_string(), |status| status.to_string());
    println!(
        "{} item(s) in {} ({})",
        items.len(),
        config.storage.database_path.display(),
        scope
    );
    for item in &items {
        print_item(item);
    }
    Ok(())
}

fn print_item(item: &Item) {
    println!(
        "- {} [{}] {} | {} | found {} at {}",
        item.id, item.status, item.title, item.category, item.date_found, item.location_found
    );
    if let Some(approval) = &item.approval {
        println!(
            "    approved by {} at {}",
            approval.approved_by,
            approval.approved_at.format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(claim) = &item.claim {
        println!(
            "    claimed by {} ({}) at {}",
            claim.claimed_by,
            claim.claimant_contact,
            claim.claimed_date.format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(reason) = &item.rejection_reason {
        println!("    rejected: {reason}");
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = in_memory_service(&config)?;

    println!("Community lost & found demo");
    if let Err(err) = walk_lifecycle(&service, &config, &args) {
        println!("  Demo stopped: {err}");
    }

    println!("\nNotification feed (newest first)");
    for entry in service.notifications().recent(config.notifications.feed_limit) {
        println!(
            "  [{:<7}] {} {}",
            entry.severity.label(),
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.message
        );
    }
    Ok(())
}

fn walk_lifecycle<R>(
    service: &LostFoundService<R>,
    config: &AppConfig,
    args: &DemoArgs,
) -> Result<(), ItemError>
where
    R: ItemRepository + 'static,
{
    let submission = ItemSubmission {
        title: args.title.clone(),
        description: "Navy blue backpack with a laptop sleeve and a keyring".to_string(),
        category: "Bags & Backpacks".to_string(),
        location_found: "Central Library, 2nd floor".to_string(),
        date_found: chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
        contact_info: "front-desk@library.example".to_string(),
    };
    let item = service.submissions().submit(submission, None)?;
    println!("- Submitted \"{}\" as {} -> {}", item.title, item.id, item.status);

    let grant = service.gate().login(&ModeratorCredentials {
        username: config.moderator.username.clone(),
        password: config.moderator.password.clone(),
    })?;
    let moderator = service.gate().authorize(&grant.token)?;
    println!("- Moderator {} signed in", moderator.username());

    let approved = service.moderation().approve(&moderator, &item.id, None)?;
    println!("- Approved -> {}", approved.status);

    let claimants = args.claimants.max(1);
    let outcomes: Vec<(String, Result<Item, ItemError>)> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=claimants)
            .map(|index| {
                let id = item.id.clone();
                scope.spawn(move || {
                    let name = format!("Claimant {index}");
                    let contact = format!("claimant{index}@example.com");
                    let result = service.claims().claim(&id, &name, &contact);
                    (name, result)
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    });

    println!("- {claimants} claimant(s) raced for the item");
    for (name, outcome) in &outcomes {
        match outcome {
            Ok(claimed) => println!("    {name}: won -> {}", claimed.status),
            Err(err) => println!("    {name}: {err}"),
        }
    }

    let restored = service.claims().unclaim(&moderator, &item.id)?;
    println!("- Unclaimed -> {}", restored.status);
    print_item(&restored);

    service.gate().logout(&grant.token);
    Ok(())
}
