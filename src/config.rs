//! CLI surface and strategy factory (component F/I): parses arguments, validates them per §4.F,
//! and builds the `Strategy` the rest of the pipeline runs against.

use crate::dispatcher;
use crate::dn::Dn;
use crate::error::{ConfigError, SchemaError, SplitError};
use crate::filter::Filter;
use crate::logging::LogArgs;
use crate::router::fewest_entries::FewestEntries;
use crate::router::filter_strategy::FilterStrategy;
use crate::router::hash_attribute::HashAttribute;
use crate::router::hash_rdn::HashRdn;
use crate::router::{OutsideHandling, RoutingContext, Strategy};
use crate::schema::Schema;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "split-ldif",
    version,
    about = "Splits an LDIF export across shard files using a configurable routing strategy"
)]
pub struct Cli {
    /// Source LDIF file. Repeatable; standard input is read if none are given.
    #[arg(short = 'l', long = "sourceLDIF")]
    pub source_ldif: Vec<PathBuf>,

    /// Treat every source as GZIP-compressed.
    #[arg(short = 'C', long = "sourceCompressed")]
    pub source_compressed: bool,

    /// Base path for output shard files. Required when more than one source is given.
    #[arg(short = 'o', long = "targetLDIFBasePath")]
    pub target_ldif_base_path: Option<PathBuf>,

    /// GZIP-compress every shard file written.
    #[arg(short = 'c', long = "compressTarget")]
    pub compress_target: bool,

    /// The DN below which entries are distributed across shards.
    #[arg(short = 'b', long = "splitBaseDN")]
    pub split_base_dn: String,

    /// Route entries at or above the split base to every numbered shard.
    #[arg(
        long = "addEntriesOutsideSplitBaseDNToAllSets",
        conflicts_with = "outside_dedicated_set"
    )]
    pub outside_all_sets: bool,

    /// Route entries at or above the split base to a dedicated shard file.
    #[arg(long = "addEntriesOutsideSplitBaseDNToDedicatedSet")]
    pub outside_dedicated_set: bool,

    /// Schema file or directory (repeatable). Falls back to `$INSTANCE_ROOT/config/schema` if unset.
    #[arg(long = "schemaPath")]
    pub schema_path: Vec<PathBuf>,

    /// Worker threads parsing and routing records.
    #[arg(short = 't', long = "numThreads", default_value_t = 1)]
    pub num_threads: u32,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub strategy: StrategyArgs,
}

#[derive(Subcommand, Debug)]
pub enum StrategyArgs {
    /// Hash the RDN directly below the split base (§4.B.1).
    HashRdn {
        #[arg(long = "numSets")]
        num_sets: u32,
    },
    /// Hash an attribute's value(s), falling back to hash-on-RDN when absent (§4.B.2).
    HashAttribute {
        #[arg(long = "numSets")]
        num_sets: u32,
        #[arg(long = "attribute")]
        attribute: String,
        #[arg(long = "useAllValues")]
        use_all_values: bool,
        #[arg(long = "assumeFlatDIT")]
        assume_flat_dit: bool,
    },
    /// Route to the currently smallest shard (§4.B.3).
    FewestEntries {
        #[arg(long = "numSets")]
        num_sets: u32,
        #[arg(long = "assumeFlatDIT")]
        assume_flat_dit: bool,
    },
    /// Route by the first matching filter, falling back to hash-on-RDN (§4.B.4).
    Filter {
        #[arg(long = "filter")]
        filters: Vec<String>,
        #[arg(long = "assumeFlatDIT")]
        assume_flat_dit: bool,
    },
}

/// Fully validated, ready-to-run configuration.
pub struct ResolvedConfig {
    pub sources: Vec<PathBuf>,
    pub source_compressed: bool,
    pub target_base_path: PathBuf,
    pub compress_target: bool,
    pub num_threads: u32,
    pub strategy: Strategy,
    pub schema: Arc<Schema>,
}

impl Cli {
    pub fn resolve(self) -> Result<ResolvedConfig, SplitError> {
        if self.outside_all_sets && self.outside_dedicated_set {
            return Err(ConfigError::ConflictingOutsideHandling.into());
        }
        let outside = if self.outside_all_sets {
            OutsideHandling::AllSets
        } else if self.outside_dedicated_set {
            OutsideHandling::Dedicated
        } else {
            OutsideHandling::Omit
        };

        if self.source_ldif.len() > 1 && self.target_ldif_base_path.is_none() {
            return Err(ConfigError::MissingTargetBasePath.into());
        }

        if self.num_threads < 1 {
            return Err(ConfigError::TooFewThreads(self.num_threads).into());
        }

        let split_base = Dn::parse(&self.split_base_dn).map_err(|e| {
            ConfigError::InvalidSplitBaseDn(self.split_base_dn.clone(), e.to_string())
        })?;

        let schema_files = Schema::resolve_files(&self.schema_path)?;
        if matches!(&self.strategy, StrategyArgs::Filter { .. })
            && !self.schema_path.is_empty()
            && schema_files.is_empty()
        {
            return Err(SchemaError::NoSchemaFiles(self.schema_path[0].clone()).into());
        }
        let schema = Arc::new(Schema::load_from_files(&schema_files)?);

        let make_ctx = |num_sets: u32| -> Result<RoutingContext, SplitError> {
            if num_sets < 2 {
                return Err(ConfigError::TooFewShards(num_sets).into());
            }
            Ok(RoutingContext {
                split_base: split_base.clone(),
                num_shards: num_sets,
                outside,
            })
        };

        let strategy = match self.strategy {
            StrategyArgs::HashRdn { num_sets } => {
                Strategy::HashRdn(HashRdn::new(make_ctx(num_sets)?))
            }
            StrategyArgs::HashAttribute {
                num_sets,
                attribute,
                use_all_values,
                assume_flat_dit,
            } => Strategy::HashAttribute(HashAttribute::new(
                make_ctx(num_sets)?,
                attribute,
                use_all_values,
                assume_flat_dit,
            )),
            StrategyArgs::FewestEntries {
                num_sets,
                assume_flat_dit,
            } => Strategy::FewestEntries(FewestEntries::new(make_ctx(num_sets)?, assume_flat_dit)),
            StrategyArgs::Filter {
                filters,
                assume_flat_dit,
            } => {
                if filters.len() < 2 {
                    return Err(ConfigError::TooFewFilters(filters.len()).into());
                }
                let mut parsed = Vec::with_capacity(filters.len());
                let mut seen = HashSet::new();
                for raw in filters {
                    let filter = Filter::parse(&raw).map_err(|e| ConfigError::InvalidFilter {
                        filter: raw.clone(),
                        message: e.to_string(),
                    })?;
                    let canonical = filter.canonical_form();
                    if !seen.insert(canonical.clone()) {
                        return Err(ConfigError::DuplicateFilter(canonical).into());
                    }
                    parsed.push(filter);
                }
                let num_sets = parsed.len() as u32;
                Strategy::Filter(FilterStrategy::new(
                    make_ctx(num_sets)?,
                    parsed,
                    Arc::clone(&schema),
                    assume_flat_dit,
                ))
            }
        };

        let target_base_path =
            dispatcher::resolve_base_path(self.target_ldif_base_path, &self.source_ldif);

        Ok(ResolvedConfig {
            sources: self.source_ldif,
            source_compressed: self.source_compressed,
            target_base_path,
            compress_target: self.compress_target,
            num_threads: self.num_threads,
            strategy,
            schema,
        })
    }
}
