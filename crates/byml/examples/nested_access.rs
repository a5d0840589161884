//! Example of navigating a decoded document.
//!
//! cargo run --package byml --example nested_access

use byml::{Document, from_json};

fn main() -> Result<(), byml::Error> {
    let bytes = from_json(r#"{"Actors": [{"Name": "Amy"}, {"Name": "Bob"}]}"#)?.to_bytes()?;
    let doc = Document::from_bytes(&bytes)?;

    // node = root["Actors"][1]["Name"]
    let actors = doc.key("Actors")?;
    let name = actors.index(1)?.key("Name")?.as_str()?;
    println!("{name}");

    // typed access reports the kind it found
    if let Err(e) = actors.as_hash() {
        println!("{e}");
    }

    for (i, actor) in actors.as_array()?.iter().enumerate() {
        let hash = actor.as_hash()?;
        println!("{i}: {:?}", hash.keys().collect::<Vec<_>>());
    }
    Ok(())
}
