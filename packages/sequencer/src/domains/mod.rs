// Business domains

pub mod sequences;
