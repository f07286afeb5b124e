mod apply;
mod failures;
mod refresh;
