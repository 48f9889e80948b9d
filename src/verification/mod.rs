pub mod fact_checker;
pub mod hallucination_detector;
pub mod verdict;

pub use fact_checker::FactChecker;
pub use hallucination_detector::{aggregate, HallucinationDetector};
pub use verdict::{
    Claim,
    ConsistencyLabel,
    ConsistencyStats,
    ConsistencyVerdict,
    FactLabel,
    FactVerdict,
    GateLabel,
    SampleSet,
    Verdict,
};
