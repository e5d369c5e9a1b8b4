pub mod aggregates;
pub mod iteration;
pub mod mutation;
pub mod paginate;
pub mod relations;
pub mod soft_delete;
