mod async_computations;
mod chaining;
mod combinators;
