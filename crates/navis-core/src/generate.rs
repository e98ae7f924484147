//! Synthetic test streams
//!
//! Deterministic sweeps and shifts for exercising views and transforms, and a
//! uniform random-address stream driven by a caller-supplied RNG.

use rand::Rng;

use crate::error::{Result, UsageError};
use crate::types::{SpikeEvent, SpikeStream};

const MICROS_PER_SECOND: u64 = 1_000_000;

fn require_positive(value: u64, operation: &'static str, reason: &'static str) -> Result<()> {
    if value == 0 {
        return Err(UsageError::InvalidParameter { operation, reason }.into());
    }
    Ok(())
}

/// Address of step `step` in a `0 -> n-1 -> 0` sweep over `num_channels` addresses.
const fn sweep_address(step: u64, num_channels: u64) -> u64 {
    if step < num_channels {
        step
    } else {
        2 * num_channels - 2 - step
    }
}

/// Sweep from address 0 up to `num_channels - 1` and back, `cycles` times.
///
/// Each address of a half-cycle fires `freq` consecutive spikes. Spikes are
/// evenly spaced so that all cycles fit in `length_us`.
///
/// # Errors
///
/// Returns [`UsageError::InvalidParameter`] if any argument is zero.
pub fn sweep(freq: u64, cycles: u64, num_channels: u64, length_us: u64) -> Result<SpikeStream> {
    require_positive(freq, "sweep", "freq must be greater than zero")?;
    require_positive(cycles, "sweep", "cycles must be greater than zero")?;
    require_positive(num_channels, "sweep", "num_channels must be greater than zero")?;

    let steps_per_cycle = 2 * num_channels - 1;
    let spikes_per_cycle = freq * steps_per_cycle;
    let spacing = (length_us / cycles) / spikes_per_cycle;

    let events = (0..cycles)
        .flat_map(|_| 0..steps_per_cycle)
        .flat_map(|step| (0..freq).map(move |_| sweep_address(step, num_channels)))
        .enumerate()
        .map(|(id, address)| SpikeEvent::new(address as i64, (id as u64 * spacing) as i64));
    Ok(events.collect())
}

/// Fire `freq` spikes on each address in turn, from 0 to `num_channels - 1`.
///
/// # Errors
///
/// Returns [`UsageError::InvalidParameter`] if `freq` or `num_channels` is zero.
pub fn shift(freq: u64, num_channels: u64, length_us: u64) -> Result<SpikeStream> {
    require_positive(freq, "shift", "freq must be greater than zero")?;
    require_positive(num_channels, "shift", "num_channels must be greater than zero")?;

    let spacing = length_us / (freq * num_channels);
    let events = (0..num_channels)
        .flat_map(|address| (0..freq).map(move |_| address))
        .enumerate()
        .map(|(id, address)| SpikeEvent::new(address as i64, (id as u64 * spacing) as i64));
    Ok(events.collect())
}

/// `freq` spikes per second on uniformly random addresses for `length_us`.
///
/// # Errors
///
/// Returns [`UsageError::InvalidParameter`] if `freq` or `num_channels` is zero.
pub fn random_addresses<R: Rng + ?Sized>(
    freq: u64,
    num_channels: u64,
    length_us: u64,
    rng: &mut R,
) -> Result<SpikeStream> {
    require_positive(freq, "random_addresses", "freq must be greater than zero")?;
    require_positive(num_channels, "random_addresses", "num_channels must be greater than zero")?;

    let count = freq * length_us / MICROS_PER_SECOND;
    let mut stream = SpikeStream::with_capacity(count as usize);
    for i in 0..count {
        let address = rng.gen_range(0..num_channels);
        stream.push(SpikeEvent::new(address as i64, (i * MICROS_PER_SECOND / freq) as i64));
    }
    Ok(stream)
}
