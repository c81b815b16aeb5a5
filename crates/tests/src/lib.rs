

#[cfg(test)]
mod case_workflow_tests;


#[cfg(test)]
mod duplicate_tests;

#[cfg(test)]
mod summons_tests;


#[cfg(test)]
mod material_v2_tests;

#[cfg(test)]
mod idpc_tests;

#[cfg(test)]
mod cps_tests;

#[cfg(test)]
mod concurrency_tests;

#[cfg(test)]
mod feed_tests;
