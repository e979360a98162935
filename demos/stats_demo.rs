use std::ptr::NonNull;

use clap::Parser;
use open_hash::HashTable;
use open_hash::Node;
use open_hash::hash::hash32;

#[derive(Parser, Debug)]
struct Args {
    /// Number of values to insert.
    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: usize,

    /// Percentage of the values removed again after filling.
    #[arg(short = 'r', long = "remove_percent", default_value_t = 50)]
    remove_percent: usize,

    /// Number of distinct hashes; values beyond it share chains.
    #[arg(short = 'k', long = "distinct_keys")]
    distinct_keys: Option<usize>,

    /// log2 of the minimum bucket count.
    #[arg(short = 'b', long = "min_bit", default_value_t = 4)]
    min_bit: u32,
}

fn main() {
    let args = Args::parse();
    let distinct = args.distinct_keys.unwrap_or(args.count).max(1);

    let mut nodes: Vec<Node<u64>> = (0..args.count).map(|_| Node::new()).collect();
    let base = nodes.as_mut_ptr();

    let mut table = match HashTable::try_with_min_bit(args.min_bit) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("cannot create table: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "Created HashTable with minimum bucket bit {} ({} buckets)",
        args.min_bit,
        table.capacity()
    );
    println!("Filling table with {} u64 values...", args.count);
    for i in 0..args.count {
        let value = i as u64;
        let hash = hash32(&(value % distinct as u64));
        // SAFETY: `i` is in bounds, each node is linked once, and `nodes`
        // outlives the table.
        let node = unsafe { NonNull::new_unchecked(base.add(i)) };
        if let Err(err) = unsafe { table.insert(node, value, hash) } {
            eprintln!("insert of {value} failed: {err}");
            break;
        }
    }

    println!("Inserted {} values into table", table.len());
    table.debug_stats().print();

    let to_remove = args.count * args.remove_percent.min(100) / 100;
    let mut removed = 0;
    for i in 0..to_remove {
        let value = i as u64;
        let hash = hash32(&(value % distinct as u64));
        if table.remove(hash, |&v| v == value).is_some() {
            removed += 1;
        }
    }

    println!();
    println!("Removed {removed} values");
    table.debug_stats().print();

    drop(table);
    drop(nodes);
}
