//! Sun command: query sun times without touching settings or the scheduler.

use anyhow::Result;

use crate::args::GlobalOptions;
use crate::geo::display::log_sun_times;

pub fn handle_sun_command(
    options: &GlobalOptions,
    address: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let service = super::open_service(options)?;

    let result = match address {
        Some(address) => service.get_sun_times_by_address(address, date),
        None => service.get_sun_times_by_saved_location(date),
    };

    super::emit(options, result, |result| {
        log_version!();
        log_sun_times(result);
        log_end!();
    })
}

pub fn display_help() {
    log_version!();
    log_block_start!("sun - Show sunrise, sunset and the recommended theme");
    log_block_start!("Usage: duskswitch sun [address] [--date YYYY-MM-DD] [--json]");
    log_block_start!("Arguments:");
    log_indented!("[address]  Look up this address instead of the saved location");
    log_block_start!("Options:");
    log_indented!("--date      Date in the location's own calendar (default: today there)");
    log_indented!("-j, --json  Print the full result as JSON");
    log_block_start!("Examples:");
    log_indented!("duskswitch sun");
    log_indented!("duskswitch sun Tromsø --date 2024-12-21");
    log_end!();
}
