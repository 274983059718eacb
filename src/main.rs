use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cwl_medals::clash::is_valid_month_key;
use cwl_medals::{BonusMedalService, ClanBoard, CocClient, FsWarCache, MemberStats};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cwl_medals=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(clan_tag) = args.next() else {
        eprintln!("usage: cwl-medals <clan-tag> [YYYY-MM]");
        std::process::exit(2);
    };
    let month = args.next();
    if let Some(month) = &month {
        if !is_valid_month_key(month) {
            eprintln!("Invalid month format. Please use YYYY-MM format (e.g., 2025-12).");
            std::process::exit(2);
        }
    }

    let provider = Arc::new(CocClient::from_env().expect("COC_API_TOKEN must be set"));
    let data_dir = std::env::var("CWL_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let cache = Arc::new(FsWarCache::new(data_dir));
    let service = BonusMedalService::new(provider, cache);

    info!(%clan_tag, ?month, "calculating CWL bonus medals");
    let board = service.compute(&clan_tag, None, month.as_deref()).await;
    print_board(&board);
}

fn print_board(board: &ClanBoard) {
    println!("{} - CWL Bonus Medals ({})", board.clan_name, board.clan_tag);

    if let Some(error) = &board.error {
        println!("  No data available: {error}");
        return;
    }

    let (qualified, disqualified): (Vec<&MemberStats>, Vec<&MemberStats>) =
        board.members.iter().partition(|m| !m.disqualified);

    if !qualified.is_empty() {
        let flagged = qualified.iter().filter(|m| m.flagged_for_review).count();
        if flagged > 0 {
            println!("  Qualified ({}, {flagged} flagged):", qualified.len());
        } else {
            println!("  Qualified ({}):", qualified.len());
        }
        for (idx, member) in qualified.iter().enumerate() {
            let marker = if member.flagged_for_review {
                " [review: never attacked mirror]"
            } else {
                ""
            };
            println!(
                "  {:>2}. {} ({}) - {:.2} pts ({} attacks){marker}",
                idx + 1,
                member.name,
                town_hall_label(member),
                member.normalized_points,
                member.total_attacks,
            );
        }
    }

    if !disqualified.is_empty() {
        println!("  Disqualified ({}):", disqualified.len());
        for member in disqualified {
            let reason = member.disqualification_reason.as_deref().unwrap_or("Unknown");
            println!(
                "      {} ({}) - {reason}",
                member.name,
                town_hall_label(member)
            );
        }
    }
}

fn town_hall_label(member: &MemberStats) -> String {
    match member.town_hall_level {
        Some(th) => format!("TH{th}"),
        None => "TH?".to_string(),
    }
}
