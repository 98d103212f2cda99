//! Search the Discogs database from the command line:
//!
//! ```text
//! DISCOGS_TOKEN=... cargo run --example search -- "the downward spiral"
//! ```

use discogs_core::prelude::*;
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<(), DiscogsError> {
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "nine inch nails".to_owned());

    let client = Discogs::builder().memory_cache().build()?;

    let mut params = BTreeMap::new();
    params.insert("q".to_owned(), query);
    params.insert("per_page".to_owned(), "10".to_owned());

    let mut results = client.search(params);
    let mut shown = 0;
    while let Some(hit) = results.try_next().await? {
        println!("{:>9}  {}", hit.id, hit.title);
        shown += 1;
        if shown == 10 {
            break;
        }
    }
    if let Some(total) = results.total_items() {
        println!("({shown} of {total} results)");
    }
    Ok(())
}
