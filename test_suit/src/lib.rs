#[cfg(test)]
mod adapter;
#[cfg(test)]
mod document;
#[cfg(test)]
mod fixtures;
