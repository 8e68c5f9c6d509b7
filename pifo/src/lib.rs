#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use pifo_stage::*;
