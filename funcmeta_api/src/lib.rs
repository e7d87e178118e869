// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-FileCopyrightText: © 2023 Siemens AG
// SPDX-License-Identifier: MIT

pub mod admin;
pub mod blob_store;
pub mod deployment;
pub mod error;
pub mod function_id;
pub mod functions;
pub mod leader;
pub mod metadata_store;
pub mod package;
pub mod record;
pub mod registry;
pub mod util;
