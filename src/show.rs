//! Paginated draw history from the cache.
//!
//! `draws show <game>` prints one page of the cached dataset with each
//! draw's derived figures. It never refreshes; run `draws refresh` first.

use anyhow::Result;
use std::sync::Arc;

use draw_harness_core::clock::SystemClock;
use draw_harness_core::models::{Fc3dDraw, Game, SsqDraw};
use draw_harness_core::page::Page;
use draw_harness_core::store::CacheStore;

use crate::config::Config;
use crate::sqlite_cache::open_backend;
use crate::status::format_time;

pub async fn run_show(config: &Config, game: Game, page: usize, per_page: usize) -> Result<()> {
    let store = CacheStore::new(open_backend(config).await, Arc::new(SystemClock));

    match game {
        Game::Fc3d => {
            let entry = store.load::<Fc3dDraw>().await;
            let (records, saved_at) = entry.map(|e| (e.records, e.saved_at)).unwrap_or_default();
            let page = Page::of(&records, page, per_page);
            print_header(game, &page, saved_at);
            println!(
                "{:<10} {:<12} {:<6} {:>4} {:>4} {:>9} {:>9}",
                "PERIOD", "DATE", "NUMBER", "SUM", "SPAN", "ODD:EVEN", "BIG:SMALL"
            );
            for draw in page.items {
                let s = draw.stats();
                println!(
                    "{:<10} {:<12} {:<6} {:>4} {:>4} {:>9} {:>9}",
                    draw.period,
                    draw.date,
                    draw.number(),
                    s.sum,
                    s.span,
                    format!("{}:{}", s.odd_count, s.even_count),
                    format!("{}:{}", s.big_count, s.small_count),
                );
            }
            print_footer(&page);
        }
        Game::Ssq => {
            let entry = store.load::<SsqDraw>().await;
            let (records, saved_at) = entry.map(|e| (e.records, e.saved_at)).unwrap_or_default();
            let page = Page::of(&records, page, per_page);
            print_header(game, &page, saved_at);
            println!(
                "{:<10} {:<12} {:<18} {:>4} {:>4} {:>9} {:>9}",
                "PERIOD", "DATE", "RED", "BLUE", "SUM", "ODD:EVEN", "BIG:SMALL"
            );
            for draw in page.items {
                let s = draw.stats();
                let reds: Vec<String> = draw.red_balls.iter().map(|r| format!("{:02}", r)).collect();
                println!(
                    "{:<10} {:<12} {:<18} {:>4} {:>4} {:>9} {:>9}",
                    draw.period,
                    draw.date,
                    reds.join(" "),
                    format!("{:02}", draw.blue_ball),
                    s.red_sum,
                    format!("{}:{}", s.red_odd_count, s.red_even_count),
                    format!("{}:{}", s.red_big_count, s.red_small_count),
                );
            }
            print_footer(&page);
        }
    }

    Ok(())
}

fn print_header<T>(game: Game, page: &Page<'_, T>, saved_at: Option<chrono::DateTime<chrono::Utc>>) {
    println!(
        "{} ({}): {} draws, cached {}",
        game.slug(),
        game.title(),
        page.total_items,
        format_time(saved_at)
    );
    println!();
}

fn print_footer<T>(page: &Page<'_, T>) {
    if page.total_items == 0 {
        println!("(no cached draws; run `draws refresh`)");
        return;
    }
    println!();
    println!(
        "page {}/{}{}{}",
        page.number,
        page.total_pages,
        if page.has_prev() { "  [prev]" } else { "" },
        if page.has_next() { "  [next]" } else { "" },
    );
}
