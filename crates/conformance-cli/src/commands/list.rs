//! List command - print the registered tests
//!
//! Usage: inference-conformance list [--verbose]

use clap::Args;

use conformance_suite::registry::Registry;
use conformance_suite::cases;

use crate::Result;

/// List the registered tests
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Also print each test's manifests
    #[arg(short, long)]
    pub verbose: bool,
}

/// Render the listing, one test per line plus detail lines when verbose
pub fn render(registry: &Registry, verbose: bool) -> String {
    let mut out = String::new();
    for test in registry.list_all() {
        let features = if test.features.is_empty() {
            "core".to_string()
        } else {
            test.features.join(",")
        };
        out.push_str(&format!("{:50} [{features}]\n", test.short_name));
        out.push_str(&format!("    {}\n", test.description));
        if verbose {
            for manifest in test.manifests {
                out.push_str(&format!("    manifest: {manifest}\n"));
            }
        }
    }
    out
}

/// Print every registered test
pub fn run(args: ListArgs) -> Result<()> {
    print!("{}", render(&cases::registry(), args.verbose));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_names_every_case_in_order() {
        let registry = cases::registry();
        let out = render(&registry, false);

        let names: Vec<&str> = out
            .lines()
            .filter(|l| !l.starts_with(' '))
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        let expected: Vec<&str> = registry.list_all().iter().map(|t| t.short_name).collect();
        assert_eq!(names, expected);
        assert!(!out.contains("manifest:"));
    }

    #[test]
    fn test_verbose_listing_shows_manifests_and_features() {
        let out = render(&cases::registry(), true);
        assert!(out.contains("manifest: tests/basic/inferencesmodel_accepted.yaml"));
        assert!(out.contains("[SupportInferenceModel,SupportInferencePool]"));
        assert!(out.contains("[core]"));
    }
}
