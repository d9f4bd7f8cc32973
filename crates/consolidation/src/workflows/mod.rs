pub mod consolidation;
