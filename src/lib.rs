/*!
# Mess Feedback

A small web application that collects meal feedback from students and keeps
running statistics in a spreadsheet, built in Rust.

## Overview

Students pick a meal, a rating on a five-step scale and any issues they
noticed. Each submission becomes one row of a spreadsheet, and the summary
block at the top of that sheet is recomputed from every row after each
submission. An administrator opens and closes the collection window and can
reset the sheet after exporting a backup workbook.

## Architecture

### Frontend Layer
- **Technologies**: HTML templates rendered with Handlebars
- **Pages**: the student form, the admin login and the admin panel

### Backend Layer
- **Technologies**: Rust, axum, tokio
- **Core Components**:
  - Sheet Store - trait over the spreadsheet backend (local grid or Google Sheets)
  - Summary Engine - recomputes totals, averages and per-meal/per-issue counts
  - Window Control - the start/end switch for collecting feedback
  - Backup Exporter - XLSX snapshot written before every reset

### Data Persistence Layer
- The local sheet is saved with gzip compression and bincode serialization
- The collection window is saved as JSON so restarts keep it
- Backups are plain `.xlsx` workbooks

## Sheet Layout

Rows 1-20 are reserved for the window times, the summary blocks and the data
header; feedback rows start at row 21.

## Routes

- `/` - Feedback form with headline totals (only while collection is open)
- `/submit` - Records one feedback row
- `/admin`, `/logout` - Admin login and logout
- `/admin-panel` - Start/end collection, full summary, backups
- `/reset` - Backup and reset the sheet
- `/api/summary` - Summary and window as JSON
*/

pub mod cell;
pub mod config;
pub mod feedback;
pub mod layout;
pub mod saving;
pub mod spreadsheet;
pub mod store;
pub mod summary;
pub mod window;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod backup;
#[cfg(feature = "web")]
pub mod error;
#[cfg(feature = "web")]
pub mod flash;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod remote;
#[cfg(feature = "web")]
pub mod templates;

/// Re-export the core model to make it easier to use
pub use cell::*;
pub use feedback::*;
pub use spreadsheet::*;
pub use store::*;
pub use summary::*;
pub use window::*;
