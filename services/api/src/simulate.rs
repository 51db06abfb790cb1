use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use program_allocation::config::AllocationConfig;
use program_allocation::error::AppError;
use program_allocation::workflows::allocation::{
    AllocationResultsView, AllocationRunSummary, AllocationService, ApplicantId,
    ApplicantSubmission, NewOffering, OfferingId, PreferenceTriple, Rank,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::infra::{parse_seed, InMemoryAllocationStore};

const FAMILY_NAMES: [&str; 10] = [
    "Kim", "Lee", "Park", "Choi", "Jung", "Kang", "Cho", "Yoon", "Jang", "Lim",
];
const GIVEN_NAMES: [&str; 10] = [
    "Seoyeon", "Minjun", "Haeun", "Jiwoo", "Seojun", "Subin", "Yeeun", "Doyun", "Siwoo", "Hajun",
];

/// Career-day programs loaded before every simulated intake.
const DEMO_CATALOG: [(&str, &str, u32, &str); 10] = [
    ("Wellbeing Counseling Center", "career experience", 12, "psychological assessment"),
    ("English Play School", "career experience", 8, "teacher for a day"),
    ("Dobong Police Station", "career experience", 18, "police officer"),
    ("Changdo Elementary School", "career experience", 14, "elementary teacher"),
    ("Yuhwa Kindergarten", "career experience", 5, "early childhood education"),
    ("Y&C Sports Club", "career experience", 10, "sports coaching"),
    ("North Seoul Credit Union", "career experience", 8, "bank teller"),
    ("Advertising Museum", "career experience", 18, "advertising planner"),
    ("JC Magic", "career experience", 15, "magician"),
    ("Duksung Fashion Studio", "career experience", 10, "fashion designer"),
];

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Number of synthetic applicants to generate
    #[arg(long, default_value_t = 100)]
    pub(crate) students: usize,
    /// Number of applicants that resubmit with reshuffled choices
    #[arg(long, default_value_t = 10)]
    pub(crate) resubmissions: usize,
    /// Seed for both data generation and the allocation tie-break
    #[arg(long, value_parser = parse_seed)]
    pub(crate) seed: Option<u64>,
    /// Write the allocation export to this path
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        students,
        resubmissions,
        seed,
        csv,
    } = args;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let store = Arc::new(InMemoryAllocationStore::default());
    let service = AllocationService::new(store, AllocationConfig { seed });

    println!("Program allocation simulation");
    let mut catalog = Vec::with_capacity(DEMO_CATALOG.len());
    for (name, category, capacity, description) in DEMO_CATALOG {
        let offering = service.create_offering(NewOffering {
            name: name.to_string(),
            category: category.to_string(),
            capacity,
            description: description.to_string(),
        })?;
        catalog.push(offering.id);
    }
    let total_capacity: u32 = DEMO_CATALOG.iter().map(|(_, _, capacity, _)| capacity).sum();
    println!(
        "- {} programs loaded ({} seats in total)",
        catalog.len(),
        total_capacity
    );

    let submissions = synthetic_applicants(students, &catalog, &mut rng);
    for submission in &submissions {
        service.submit(submission.clone())?;
    }
    println!("- {} applications submitted", submissions.len());

    let mut resubmitted = 0;
    for original in submissions.iter().take(resubmissions) {
        let mut update = original.clone();
        update.choices = random_choices(&catalog, &mut rng);
        update.phone = Some(format!(
            "010-{:04}-{:04}",
            rng.random_range(0..10_000),
            rng.random_range(0..10_000)
        ));
        update.birthdate = Some(format!(
            "2008-{:02}-{:02}",
            rng.random_range(1..=12),
            rng.random_range(1..=28)
        ));
        match service.submit(update) {
            Ok(receipt) if receipt.is_resubmission => resubmitted += 1,
            Ok(_) => {}
            Err(err) => println!("  Resubmission rejected: {}", err),
        }
    }
    println!("- {} verified resubmissions accepted", resubmitted);

    let summary = service.allocate_with_rng(&mut rng)?;
    println!(
        "\nAllocation epoch {}: {} applicants, {} placed, {} unallocated",
        summary.epoch,
        summary.total_applicants,
        summary.allocated_count,
        summary.unallocated_count
    );

    let overview = service.applications_overview()?;
    let preferences: BTreeMap<ApplicantId, PreferenceTriple> = overview
        .applications
        .into_iter()
        .map(|record| (record.applicant_id, record.choices))
        .collect();
    let results = service.results()?;

    let violations = check_allocation(&results, &summary, &preferences);
    if violations.is_empty() {
        println!("All allocation properties hold");
    } else {
        for violation in &violations {
            println!("  Violation: {}", violation);
        }
    }

    render_program_stats(&results);

    if let Some(path) = csv {
        let export = service.export_csv()?;
        std::fs::write(&path, &export.body)?;
        println!("\nExport written to {} ({})", path.display(), export.filename);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Simulation(format!(
            "{} allocation property violation(s)",
            violations.len()
        )))
    }
}

fn synthetic_applicants<R: Rng + ?Sized>(
    count: usize,
    catalog: &[OfferingId],
    rng: &mut R,
) -> Vec<ApplicantSubmission> {
    let mut used = HashSet::new();
    let mut applicants = Vec::with_capacity(count);
    while applicants.len() < count {
        let serial = format!("2024{:04}", rng.random_range(0..10_000));
        if !used.insert(serial.clone()) {
            if used.len() >= 10_000 {
                break;
            }
            continue;
        }

        let family = FAMILY_NAMES.choose(rng).copied().unwrap_or("Kim");
        let given = GIVEN_NAMES.choose(rng).copied().unwrap_or("Seoyeon");
        applicants.push(ApplicantSubmission {
            applicant_id: ApplicantId(serial),
            name: format!("{family} {given}"),
            phone: None,
            birthdate: None,
            choices: random_choices(catalog, rng),
        });
    }
    applicants
}

fn random_choices<R: Rng + ?Sized>(catalog: &[OfferingId], rng: &mut R) -> PreferenceTriple {
    let picked: Vec<OfferingId> = catalog.choose_multiple(rng, 3).copied().collect();
    PreferenceTriple([picked[0], picked[1], picked[2]])
}

/// Re-derive the allocation properties from the persisted epoch.
fn check_allocation(
    results: &AllocationResultsView,
    summary: &AllocationRunSummary,
    preferences: &BTreeMap<ApplicantId, PreferenceTriple>,
) -> Vec<String> {
    let mut violations = Vec::new();

    for stats in &results.program_stats {
        if stats.allocated > stats.capacity as usize {
            violations.push(format!(
                "{} holds {} placements over capacity {}",
                stats.program_name, stats.allocated, stats.capacity
            ));
        }
    }

    let mut placed = HashSet::new();
    for assignment in &summary.assignments {
        if !placed.insert(&assignment.applicant_id) {
            violations.push(format!("{} placed more than once", assignment.applicant_id));
        }

        let expected = preferences
            .get(&assignment.applicant_id)
            .map(|choices| choices.rank_of(assignment.offering_id))
            .unwrap_or(Rank::Unranked);
        if assignment.rank != expected {
            violations.push(format!(
                "{} recorded rank {} but program {} is rank {}",
                assignment.applicant_id,
                assignment.rank.as_number(),
                assignment.offering_id,
                expected.as_number()
            ));
        }
    }

    if summary.allocated_count + summary.unallocated_count != preferences.len() {
        violations.push(format!(
            "{} placed + {} unallocated does not match {} applicants",
            summary.allocated_count,
            summary.unallocated_count,
            preferences.len()
        ));
    }

    violations
}

fn render_program_stats(results: &AllocationResultsView) {
    println!("\nPer-program placements");
    for stats in &results.program_stats {
        println!(
            "  - {}: {}/{} seats | 1st {} | 2nd {} | 3rd {} | manual {}",
            stats.program_name,
            stats.allocated,
            stats.capacity,
            stats.first_choice,
            stats.second_choice,
            stats.third_choice,
            stats.unranked
        );
    }

    let placed = results.total_allocated.max(1) as f32;
    let first = results
        .program_stats
        .iter()
        .map(|stats| stats.first_choice)
        .sum::<usize>();
    println!(
        "First-choice satisfaction: {:.1}% of placed applicants",
        first as f32 / placed * 100.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(seed: u64, csv: Option<PathBuf>) -> SimulateArgs {
        SimulateArgs {
            students: 60,
            resubmissions: 5,
            seed: Some(seed),
            csv,
        }
    }

    #[test]
    fn synthetic_applicants_pick_three_distinct_programs() {
        let catalog: Vec<OfferingId> = (1..=10).map(OfferingId).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let applicants = synthetic_applicants(40, &catalog, &mut rng);

        assert_eq!(applicants.len(), 40);
        let ids: HashSet<_> = applicants.iter().map(|a| &a.applicant_id).collect();
        assert_eq!(ids.len(), 40);
        for applicant in &applicants {
            assert!(applicant.choices.duplicate().is_none());
        }
    }

    #[test]
    fn simulation_completes_with_seed() {
        run_simulation(args(11, None)).expect("simulation holds its properties");
    }

    #[test]
    fn simulation_writes_export_when_requested() {
        let path = std::env::temp_dir().join(format!(
            "allocation_simulation_{}.csv",
            std::process::id()
        ));
        run_simulation(args(5, Some(path.clone()))).expect("simulation runs");

        let written = std::fs::read(&path).expect("export written");
        assert!(written.starts_with(&[0xEF, 0xBB, 0xBF]));
        let _ = std::fs::remove_file(path);
    }
}
