/*!
 * MeMS Demo Driver
 *
 * Replays the classic MeMS walkthrough against the library:
 * - ten 1000-byte allocations
 * - interior address translation with a write/read round trip
 * - stats before and after freeing and reallocating one block
 * - a second session after finish
 */

use anyhow::Context;
use mems::monitoring::tracer::session_span;
use mems::{init_tracing, Handle, MemoryManager, MemsConfig};
use tracing::info;

const BLOCK_SIZE: usize = std::mem::size_of::<i32>() * 250;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = MemsConfig::from_env().context("invalid MEMS_* configuration")?;
    info!(?config, "MeMS demo starting");
    let mut mems = MemoryManager::new(config)?;

    first_session(&mut mems)?;
    second_session(&mut mems)?;

    info!("MeMS demo complete");
    Ok(())
}

fn first_session(mems: &mut MemoryManager) -> anyhow::Result<()> {
    let _span = session_span(1).entered();
    mems.init()?;

    println!("\n------- Allocated virtual addresses [mems_malloc] -------");
    let mut blocks: Vec<Handle> = Vec::with_capacity(10);
    for _ in 0..10 {
        let handle = mems.allocate(BLOCK_SIZE)?;
        println!("Virtual address: {}", handle.raw());
        blocks.push(handle);
    }

    println!("\n------ Assigning value to Virtual address [mems_get] -----");
    let int = std::mem::size_of::<i32>();
    let second_slot = mems.translate_offset(blocks[0], int)?;
    mems.write_bytes(blocks[0], int, &200i32.to_ne_bytes())?;
    let physical = mems.translate(blocks[0])?;
    let value = mems.read_bytes(blocks[0], int, int)?;
    let value = i32::from_ne_bytes(
        value
            .try_into()
            .map_err(|_| anyhow::anyhow!("short read from {}", blocks[0]))?,
    );
    println!(
        "Virtual address: {}\tPhysical Address: {}",
        blocks[0].raw(),
        physical
    );
    println!("Value written: {} (at {})", value, second_slot);

    println!("\n--------- Printing Stats [mems_print_stats] --------");
    print_stats(mems)?;

    println!("\n--------- Freeing up the memory [mems_free] --------");
    mems.release(blocks[3])?;
    print_stats(mems)?;
    blocks[3] = mems.allocate(BLOCK_SIZE)?;
    print_stats(mems)?;

    mems.finish()?;
    Ok(())
}

fn second_session(mems: &mut MemoryManager) -> anyhow::Result<()> {
    let _span = session_span(2).entered();
    mems.init()?;

    let first = mems.allocate(1000)?;
    let second = mems.allocate(2000)?;
    println!("Memory 1: {}", first);
    println!("Memory 2: {}", second);
    print_stats(mems)?;

    mems.release(first)?;
    mems.release(second)?;
    print_stats(mems)?;

    mems.finish()?;
    Ok(())
}

fn print_stats(mems: &MemoryManager) -> anyhow::Result<()> {
    let stats = mems.report()?;
    println!("{}", stats);
    tracing::debug!(
        utilization = stats.utilization(),
        json = %stats.to_json()?,
        "stats snapshot"
    );
    Ok(())
}
