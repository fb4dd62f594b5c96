//! Modules layer - storage backends behind the tree persistence seam

pub mod storage;
