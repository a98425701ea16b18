use crate::infra::InMemoryBalanceStore;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

use perkpass::catalog::{collective_geofences, BenefitCatalog, BenefitKey, VendorKey};
use perkpass::error::AppError;
use perkpass::geo::GeoReading;
use perkpass::redemption::{RedemptionDecision, RedemptionRequest, RedemptionService};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date for the walkthrough (YYYY-MM-DD, defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Deny out-of-fence redemptions instead of recording them as advisory.
    #[arg(long)]
    pub(crate) enforce_geofence: bool,
    /// Pass id used throughout the walkthrough.
    #[arg(long, default_value = "DEMO-PASS")]
    pub(crate) pass_id: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        enforce_geofence,
        pass_id,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let catalog = Arc::new(BenefitCatalog::collective());
    let fences = Arc::new(collective_geofences());
    let service = RedemptionService::new(
        catalog.clone(),
        fences.clone(),
        Arc::new(InMemoryBalanceStore::default()),
        enforce_geofence,
    );

    println!("Collective pass walkthrough ({today})");
    println!(
        "Geofencing is {}.",
        if enforce_geofence {
            "enforced"
        } else {
            "advisory"
        }
    );

    println!("\nVendor catalog");
    for vendor in catalog.vendors() {
        let fenced = fences.fence_for(&vendor.key).is_some();
        println!(
            "  {:<12} {}{}",
            vendor.key,
            vendor.label,
            if fenced { "" } else { " (no geofence)" }
        );
        for benefit in catalog.benefits_for(&vendor.key) {
            println!(
                "    - {} ({} per month, counter {})",
                benefit.label, benefit.max_per_month, benefit.counter
            );
        }
    }

    let Some(sonoma) = fences.fence_for(&VendorKey::new("SONOMA")) else {
        println!("\nSONOMA geofence missing, skipping redemption scenarios");
        return Ok(());
    };
    let at_the_bar = GeoReading {
        lat: sonoma.lat,
        lng: sonoma.lng,
        accuracy: 3.0,
    };
    let down_the_block = GeoReading {
        lat: sonoma.lat + 60.0 / 111_194.9,
        lng: sonoma.lng,
        accuracy: 5.0,
    };

    let location = fences.evaluate(Some(&at_the_bar));
    if let Some(candidate) = &location.candidate {
        println!(
            "\nClosest shop to the demo reading: {} ({:.1} m effective, confidence {:?})",
            candidate.vendor, candidate.effective_distance, location.confidence
        );
    }

    println!("\nRedemption scenarios for pass {pass_id}");
    let mut request = scenario_request(&pass_id, "SONOMA", "PERCENT_10");
    request.geo = Some(at_the_bar);
    render_decision("Standing at the wine bar", &service.redeem(&request, today)?);

    request.geo = Some(down_the_block);
    render_decision("Sixty meters down the block", &service.redeem(&request, today)?);

    let mut repeat = scenario_request(&pass_id, "SONOMA", "PERCENT_10");
    repeat.geo = Some(at_the_bar);
    render_decision(
        "Back at the bar, same month",
        &service.redeem(&repeat, today)?,
    );

    let workshop = scenario_request(&pass_id, "KIDS_CREATE", "FRIDAY_WORKSHOP");
    render_decision("Kids Create workshop today", &service.redeem(&workshop, today)?);

    Ok(())
}

fn scenario_request(pass_id: &str, vendor: &str, benefit: &str) -> RedemptionRequest {
    RedemptionRequest {
        pass_id: pass_id.to_string(),
        vendor: VendorKey::new(vendor),
        benefit: BenefitKey::new(benefit),
        geo: None,
        cart: None,
        context: None,
    }
}

fn render_decision(label: &str, decision: &RedemptionDecision) {
    if decision.approved {
        println!(
            "  {label}: approved (geo validated: {})",
            decision.geo_validated
        );
    } else {
        let summary = decision
            .reason
            .as_ref()
            .map(|reason| reason.summary())
            .unwrap_or_else(|| "denied".to_string());
        println!("  {label}: denied ({summary})");
    }
    for (counter, remaining) in &decision.balances {
        println!("      {counter}: {remaining}");
    }
}
