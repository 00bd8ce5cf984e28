use super::{Outcome, report_warnings};
use crate::display::{Format, Projection, render_summaries};
use crate::error::Result;
use crate::query::{Filter, Listing};
use crate::store::TicketStore;

/// Output options shared by the listing commands
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
    pub field: Option<String>,
    pub output_json: bool,
}

impl ListOptions {
    fn projection(&self) -> Result<Projection> {
        match &self.field {
            Some(name) => Projection::field(name),
            None => Ok(Projection::All),
        }
    }

    fn format(&self) -> Format {
        if self.output_json {
            Format::Json
        } else {
            Format::Text
        }
    }
}

/// List tickets matching `filter` in id order
pub fn cmd_ls(store: &TicketStore, filter: &Filter, options: &ListOptions) -> Result<Outcome> {
    let projection = options.projection()?;
    let listing = store.list(filter, options.limit, options.offset)?;
    print_listing(store, &listing, &projection, options.format())
}

/// List tickets that can be started right now
pub fn cmd_ready(store: &TicketStore, options: &ListOptions) -> Result<Outcome> {
    let projection = options.projection()?;
    let listing = store.ready(options.limit)?;
    print_listing(store, &listing, &projection, options.format())
}

fn print_listing(
    store: &TicketStore,
    listing: &Listing,
    projection: &Projection,
    format: Format,
) -> Result<Outcome> {
    let rendered = render_summaries(&listing.tickets, projection, format)?;
    match format {
        Format::Json => println!("{rendered}"),
        Format::Text => print!("{rendered}"),
    }
    Ok(report_warnings(store, &listing.warnings))
}
