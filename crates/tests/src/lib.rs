
#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod mongo_tests;
#[cfg(test)]
mod reward_tests;
