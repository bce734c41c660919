// Count the number of nodes, ways and relations in a PBF file given as the
// first command line argument.

use log::info;
use osmpbf_stream::{decode_parallel, DecodedBatch, DecoderOptions, Entity};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let arg = std::env::args_os()
        .nth(1)
        .expect("need a *.osm.pbf file as argument");
    let path = std::path::Path::new(&arg);
    let bytes = std::fs::read(path).unwrap();

    info!("read {} bytes from {}", bytes.len(), path.display());
    println!("Counting...");

    let mut nodes = 0u64;
    let mut ways = 0u64;
    let mut relations = 0u64;

    match decode_parallel(&bytes, &DecoderOptions::default()) {
        Ok(batches) => {
            for batch in batches {
                let entities = match batch {
                    DecodedBatch::Header(batch) | DecodedBatch::Data(batch) => batch.into_entities(),
                    DecodedBatch::RawData(_) => continue,
                };
                for entity in entities {
                    match entity {
                        Entity::Node(_) => nodes += 1,
                        Entity::Way(_) => ways += 1,
                        Entity::Relation(_) => relations += 1,
                        Entity::Header(_) => {}
                    }
                }
            }
            println!("Nodes: {nodes}");
            println!("Ways: {ways}");
            println!("Relations: {relations}");
        }
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    }
}
