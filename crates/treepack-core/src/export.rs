use crate::model::{Atlas, Page};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Display;
use std::io::{self, Write};

/// Write the plain-text index of one page: one `<key> <x> <y> <width> <height>`
/// line per placement, in the page's (key-sorted) placement order.
pub fn write_index<K: Display, W: Write>(page: &Page<K>, mut out: W) -> io::Result<()> {
    for p in &page.placements {
        writeln!(
            out,
            "{} {} {} {} {}",
            p.key, p.frame.x, p.frame.y, p.frame.w, p.frame.h
        )?;
    }
    Ok(())
}

/// Index text of one page as a `String`.
pub fn to_index_string<K: Display>(page: &Page<K>) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_index(page, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serialize the whole `Atlas` as a JSON object `{ pages, meta }`.
pub fn to_json<K: ToString + Clone + Serialize>(atlas: &Atlas<K>) -> Value {
    let pages_val = atlas
        .pages
        .iter()
        .map(|p| {
            let placements: Vec<Value> = p
                .placements
                .iter()
                .map(|pl| {
                    json!({
                        "key": pl.key.to_string(),
                        "frame": {"x": pl.frame.x, "y": pl.frame.y, "w": pl.frame.w, "h": pl.frame.h},
                        "hasAlpha": pl.has_alpha,
                    })
                })
                .collect();
            json!({
                "id": p.id,
                "width": p.width,
                "height": p.height,
                "placements": placements,
            })
        })
        .collect::<Vec<_>>();
    json!({"pages": pages_val, "meta": &atlas.meta})
}
